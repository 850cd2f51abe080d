//! Utility slash commands: /start, /help

use serenity::builder::CreateApplicationCommand;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        CreateApplicationCommand::default()
            .name("start")
            .description("Say hello and learn how to request an image")
            .to_owned(),
        CreateApplicationCommand::default()
            .name("help")
            .description("Show how to use the image bot")
            .to_owned(),
    ]
}
