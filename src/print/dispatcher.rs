// Print Dispatcher
// Forwards print requests from the bridge to the print subsystem, one call
// per copy, in order. Failures are reported on the print-error channel.

use std::sync::Arc;

use crate::bridge::{EventEmitter, HostEvent, PrintFailure};
use crate::print::{PrintError, PrintJob, PrintRequest, PrintSubsystem};

pub struct PrintDispatcher {
    subsystem: Arc<dyn PrintSubsystem>,
    emitter: Arc<EventEmitter>,
}

impl PrintDispatcher {
    pub fn new(subsystem: Arc<dyn PrintSubsystem>, emitter: Arc<EventEmitter>) -> Self {
        Self { subsystem, emitter }
    }

    /// Forward a request. Returns the number of forward calls that succeeded.
    ///
    /// Stops at the first failed forward; the failure is emitted as a
    /// `print-error` event and returned.
    pub fn dispatch(&self, request: PrintRequest) -> Result<u32, PrintError> {
        let result = match &request {
            PrintRequest::Named {
                printer_name,
                copies,
            } => {
                log::info!(
                    "[PrintDispatcher] Print request: printer={} copies={}",
                    printer_name,
                    copies
                );
                (1..=*copies).try_fold(0, |sent, copy| {
                    self.subsystem
                        .forward(PrintJob::Named {
                            printer_name: printer_name.as_str(),
                            copy,
                        })
                        .map(|()| sent + 1)
                })
            }
            PrintRequest::Html { html, printer_name } => {
                log::info!(
                    "[PrintDispatcher] Print HTML content: printer={} length={}",
                    printer_name,
                    html.len()
                );
                self.subsystem
                    .forward(PrintJob::Html {
                        html: html.as_str(),
                        printer_name: printer_name.as_str(),
                    })
                    .map(|()| 1)
            }
            PrintRequest::Bytes {
                bytes,
                printer_name,
            } => {
                log::info!(
                    "[PrintDispatcher] Print bytes: printer={} size={}",
                    printer_name,
                    bytes.len()
                );
                self.subsystem
                    .forward(PrintJob::Bytes {
                        bytes: bytes.as_slice(),
                        printer_name: printer_name.as_str(),
                    })
                    .map(|()| 1)
            }
        };

        if let Err(e) = &result {
            log::error!(
                "[PrintDispatcher] {} to {} failed: {}",
                request.kind(),
                request.printer_name(),
                e
            );
            self.emitter.emit(HostEvent::PrintError(PrintFailure {
                kind: request.kind().to_string(),
                printer_name: request.printer_name().to_string(),
                message: e.to_string(),
            }));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{EventChannel, Subscriptions};
    use crate::print::UnavailablePrintSubsystem;
    use std::sync::Mutex;

    /// Owned copy of a forwarded job
    #[derive(Debug, Clone, PartialEq)]
    enum Forwarded {
        Named(String, u32),
        Html(String, String),
        Bytes(Vec<u8>, String),
    }

    #[derive(Default)]
    struct RecordingSubsystem {
        jobs: Mutex<Vec<Forwarded>>,
        fail_on_call: Option<usize>,
    }

    impl PrintSubsystem for RecordingSubsystem {
        fn forward(&self, job: PrintJob<'_>) -> Result<(), PrintError> {
            let mut jobs = self.jobs.lock().unwrap();
            if self.fail_on_call == Some(jobs.len() + 1) {
                return Err(PrintError::Rejected {
                    printer: "P".to_string(),
                    reason: "paper out".to_string(),
                });
            }
            jobs.push(match job {
                PrintJob::Named { printer_name, copy } => Forwarded::Named(printer_name.to_string(), copy),
                PrintJob::Html { html, printer_name } => {
                    Forwarded::Html(html.to_string(), printer_name.to_string())
                }
                PrintJob::Bytes {
                    bytes,
                    printer_name,
                } => Forwarded::Bytes(bytes.to_vec(), printer_name.to_string()),
            });
            Ok(())
        }
    }

    fn dispatcher_with(
        subsystem: Arc<dyn PrintSubsystem>,
    ) -> (PrintDispatcher, Arc<Mutex<Vec<HostEvent>>>) {
        let emitter = Arc::new(EventEmitter::new());
        let subscriptions = Arc::new(Subscriptions::new());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        subscriptions.subscribe(EventChannel::PrintError, move |event| {
            sink.lock().unwrap().push(event.clone())
        });
        emitter.attach(subscriptions);
        (PrintDispatcher::new(subsystem, emitter), errors)
    }

    fn named(copies: u32) -> PrintRequest {
        PrintRequest::Named {
            printer_name: "Front Desk".to_string(),
            copies,
        }
    }

    #[test]
    fn test_named_print_forwards_each_copy_in_order() {
        let subsystem = Arc::new(RecordingSubsystem::default());
        let (dispatcher, errors) = dispatcher_with(subsystem.clone());

        assert_eq!(dispatcher.dispatch(named(3)), Ok(3));

        let jobs = subsystem.jobs.lock().unwrap();
        assert_eq!(
            *jobs,
            vec![
                Forwarded::Named("Front Desk".to_string(), 1),
                Forwarded::Named("Front Desk".to_string(), 2),
                Forwarded::Named("Front Desk".to_string(), 3),
            ]
        );
        assert!(errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_named_print_zero_copies_forwards_nothing() {
        let subsystem = Arc::new(RecordingSubsystem::default());
        let (dispatcher, errors) = dispatcher_with(subsystem.clone());

        assert_eq!(dispatcher.dispatch(named(0)), Ok(0));
        assert!(subsystem.jobs.lock().unwrap().is_empty());
        assert!(errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_html_and_bytes_forward_unchanged_once() {
        let subsystem = Arc::new(RecordingSubsystem::default());
        let (dispatcher, _) = dispatcher_with(subsystem.clone());

        dispatcher
            .dispatch(PrintRequest::Html {
                html: "<p>Total: 4.50</p>".to_string(),
                printer_name: "Kitchen".to_string(),
            })
            .unwrap();
        dispatcher
            .dispatch(PrintRequest::Bytes {
                bytes: vec![0x1b, 0x40],
                printer_name: "Label".to_string(),
            })
            .unwrap();

        let jobs = subsystem.jobs.lock().unwrap();
        assert_eq!(
            *jobs,
            vec![
                Forwarded::Html("<p>Total: 4.50</p>".to_string(), "Kitchen".to_string()),
                Forwarded::Bytes(vec![0x1b, 0x40], "Label".to_string()),
            ]
        );
    }

    #[test]
    fn test_failure_stops_copies_and_emits_print_error() {
        let subsystem = Arc::new(RecordingSubsystem {
            fail_on_call: Some(2),
            ..Default::default()
        });
        let (dispatcher, errors) = dispatcher_with(subsystem.clone());

        let result = dispatcher.dispatch(named(3));
        assert!(matches!(result, Err(PrintError::Rejected { .. })));
        assert_eq!(subsystem.jobs.lock().unwrap().len(), 1);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            HostEvent::PrintError(failure) => {
                assert_eq!(failure.kind, "print");
                assert_eq!(failure.printer_name, "Front Desk");
                assert!(failure.message.contains("paper out"));
            }
            other => panic!("Expected PrintError event, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_subsystem_surfaces_error() {
        let (dispatcher, errors) = dispatcher_with(Arc::new(UnavailablePrintSubsystem));

        let result = dispatcher.dispatch(PrintRequest::Bytes {
            bytes: vec![1, 2, 3],
            printer_name: "Label".to_string(),
        });

        assert_eq!(result, Err(PrintError::Unavailable));
        assert_eq!(errors.lock().unwrap().len(), 1);
    }
}
