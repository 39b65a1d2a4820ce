// Print request types and the external print subsystem interface

use serde::{Deserialize, Serialize};

/// Print request received from the UI. Consumed once, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PrintRequest {
    /// Print `copies` copies on a named printer
    Named { printer_name: String, copies: u32 },
    /// Print an HTML document
    Html { html: String, printer_name: String },
    /// Send a raw byte payload (e.g. ESC/POS) to a printer
    Bytes { bytes: Vec<u8>, printer_name: String },
}

impl PrintRequest {
    /// Bridge channel the request arrives on
    pub fn kind(&self) -> &'static str {
        match self {
            PrintRequest::Named { .. } => "print",
            PrintRequest::Html { .. } => "print-html-content",
            PrintRequest::Bytes { .. } => "print-bytes",
        }
    }

    pub fn printer_name(&self) -> &str {
        match self {
            PrintRequest::Named { printer_name, .. }
            | PrintRequest::Html { printer_name, .. }
            | PrintRequest::Bytes { printer_name, .. } => printer_name,
        }
    }
}

/// A single forward call to the print subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintJob<'a> {
    /// One copy of a named-printer request; `copy` counts from 1
    Named { printer_name: &'a str, copy: u32 },
    Html { html: &'a str, printer_name: &'a str },
    Bytes { bytes: &'a [u8], printer_name: &'a str },
}

/// Error types for print forwarding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum PrintError {
    /// No print subsystem is available to take the job
    Unavailable,

    /// The subsystem refused the job
    Rejected { printer: String, reason: String },
}

impl std::fmt::Display for PrintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrintError::Unavailable => write!(f, "No print subsystem is configured"),
            PrintError::Rejected { printer, reason } => {
                write!(f, "Printer {} rejected the job: {}", printer, reason)
            }
        }
    }
}

impl std::error::Error for PrintError {}

/// External print subsystem. Rendering and spooling happen behind it.
pub trait PrintSubsystem: Send + Sync {
    fn forward(&self, job: PrintJob<'_>) -> Result<(), PrintError>;
}

/// Subsystem used when none is configured: every job fails, so print
/// requests surface as `print-error` events instead of vanishing.
#[derive(Debug, Default)]
pub struct UnavailablePrintSubsystem;

impl PrintSubsystem for UnavailablePrintSubsystem {
    fn forward(&self, _job: PrintJob<'_>) -> Result<(), PrintError> {
        Err(PrintError::Unavailable)
    }
}
