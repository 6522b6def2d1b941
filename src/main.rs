use clap::Parser;
use log::info;
use sbs_exporter::cli::Cli;
use sbs_exporter::config::ApplicationConfig;
use sbs_exporter::exporter::Exporter;
use sbs_exporter::ingestor::{FeedReader, Ingestor};
use sbs_exporter::logging::setup_logging;
use sbs_exporter::parser::types::ReceivedMessage;
use sbs_exporter::parser::AircraftParser;
use sbs_exporter::sink::{InfluxWriter, ReqwestClient};
use sbs_exporter::thread_manager::ThreadManager;

const LINE_QUEUE_CAPACITY: usize = 4096;
const MESSAGE_QUEUE_CAPACITY: usize = 4096;
const EXPORTER_PERIOD: std::time::Duration = std::time::Duration::from_millis(250);

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.logging_level);

    let application_config =
        match ApplicationConfig::load(cli.config_file.as_ref(), &cli.overrides) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Config error: {e}");
                return std::process::ExitCode::FAILURE;
            }
        };
    info!("Main: Application started with {application_config:?}");

    let writer = match ReqwestClient::new().and_then(|client| {
        InfluxWriter::new(
            client,
            &application_config.sink.url,
            &application_config.sink.database,
        )
    }) {
        Ok(writer) => writer,
        Err(e) => {
            log::error!("Error constructing sink writer: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let (signal_sender, signal_receiver) = crossbeam_channel::bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal_sender.try_send(());
    }) {
        log::error!("Failed to install signal handler: {e}");
        return std::process::ExitCode::FAILURE;
    }

    let (lines_sender, lines_receiver): (
        crossbeam_channel::Sender<String>,
        crossbeam_channel::Receiver<String>,
    ) = crossbeam_channel::bounded(LINE_QUEUE_CAPACITY);

    let (messages_sender, messages_receiver): (
        crossbeam_channel::Sender<ReceivedMessage>,
        crossbeam_channel::Receiver<ReceivedMessage>,
    ) = crossbeam_channel::bounded(MESSAGE_QUEUE_CAPACITY);

    let mut thread_manager = ThreadManager::new();
    let stop_signal = thread_manager.stop_signal();

    let reader = FeedReader::new(
        &application_config.feed.host,
        application_config.feed.port,
    );
    let ingestor = Ingestor::new(reader, lines_sender, stop_signal);
    let parser = AircraftParser::new(lines_receiver, messages_sender);
    let exporter = Exporter::new(
        writer,
        messages_receiver,
        application_config.export.interval(),
    );

    thread_manager.add_task(ingestor, std::time::Duration::ZERO);
    thread_manager.add_task(parser, std::time::Duration::ZERO);
    thread_manager.add_task(exporter, EXPORTER_PERIOD);

    match cli.duration {
        Some(duration) => {
            let _ = signal_receiver.recv_timeout(std::time::Duration::from_secs(duration));
        }
        None => {
            let _ = signal_receiver.recv();
        }
    }

    info!("Main: Shutting down.");
    thread_manager.stop_all_tasks();
    thread_manager.wait_on_all_tasks();

    info!("Main: Program finished.");
    std::process::ExitCode::SUCCESS
}
