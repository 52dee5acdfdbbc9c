use crate::config::Config;
use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::helpers::ControlWriter;
use crate::session::Session;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

// PASV lives with the rest of the data-channel plumbing
use crate::core_network::pasv;

type CommandHandler = Box<
    dyn Fn(
            ControlWriter,
            Arc<Config>,
            Arc<TokioMutex<Session>>,
            Vec<u8>, // Argument, everything after the keyword, as raw bytes
        ) -> Pin<Box<dyn Future<Output = Result<(), std::io::Error>> + Send>>
        + Send
        + Sync,
>;

pub fn initialize_command_handlers() -> HashMap<FtpCommand, CommandHandler> {
    let mut handlers: HashMap<FtpCommand, CommandHandler> = HashMap::new();

    handlers.insert(
        FtpCommand::USER,
        Box::new(|writer, config, session, arg| {
            Box::pin(crate::core_ftpcommand::user::handle_user_command(
                writer, config, session, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::PASS,
        Box::new(|writer, config, _session, arg| {
            Box::pin(crate::core_ftpcommand::pass::handle_pass_command(
                writer, config, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::PWD,
        Box::new(|writer, _config, session, _arg| {
            Box::pin(crate::core_ftpcommand::pwd::handle_pwd_command(
                writer, session,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::CWD,
        Box::new(|writer, config, session, arg| {
            Box::pin(crate::core_ftpcommand::cwd::handle_cwd_command(
                writer, config, session, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::TYPE,
        Box::new(|writer, _config, _session, arg| {
            Box::pin(crate::core_ftpcommand::type_::handle_type_command(
                writer, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::SYST,
        Box::new(|writer, _config, _session, _arg| {
            Box::pin(crate::core_ftpcommand::syst::handle_syst_command(writer))
        }),
    );

    handlers.insert(
        FtpCommand::PASV,
        Box::new(|writer, config, session, arg| {
            Box::pin(pasv::handle_pasv_command(writer, config, session, arg))
        }),
    );

    handlers.insert(
        FtpCommand::LIST,
        Box::new(|writer, config, session, arg| {
            Box::pin(crate::core_ftpcommand::list::handle_list_command(
                writer, config, session, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::RETR,
        Box::new(|writer, config, session, arg| {
            Box::pin(crate::core_ftpcommand::retr::handle_retr_command(
                writer, config, session, arg,
            ))
        }),
    );

    handlers.insert(
        FtpCommand::QUIT,
        Box::new(|writer, _config, _session, _arg| {
            Box::pin(crate::core_ftpcommand::quit::handle_quit_command(writer))
        }),
    );

    handlers
}
