pub mod builder;
mod constants;
pub mod schema;
pub mod types;

use crate::parser::builder::build_message_from_string;
use crate::parser::types::ReceivedMessage;
use crate::thread_manager::SteppableTask;

/// Turns raw feed lines into parsed messages, dropping lines that do not
/// follow the aircraft-position grammar.
pub struct AircraftParser {
    receiver: crossbeam_channel::Receiver<String>,
    sender: crossbeam_channel::Sender<ReceivedMessage>,
}
impl AircraftParser {
    #[must_use]
    pub fn new(
        lines_receiver: crossbeam_channel::Receiver<String>,
        message_sender: crossbeam_channel::Sender<ReceivedMessage>,
    ) -> Self {
        AircraftParser {
            receiver: lines_receiver,
            sender: message_sender,
        }
    }
}

impl SteppableTask for AircraftParser {
    fn step(&mut self) -> bool {
        let Ok(line) = self.receiver.recv() else {
            log::info!("AircraftParser: upstream disconnected");
            return false;
        };

        match build_message_from_string(&line) {
            Ok(message) => {
                let received = ReceivedMessage {
                    message,
                    received_at: chrono::Utc::now(),
                };
                if let Err(err) = self.sender.send(received) {
                    log::error!("AircraftParser: failed to forward message: {err}");
                    return false;
                }
            }
            Err(err) => log::warn!("Discarding line: {err}"),
        }

        true
    }
}
