//! # Imagine Command
//!
//! Generate an image from a text prompt.

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_imagine_command()]
}

fn create_imagine_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("imagine")
        .description("Generate an image with Stable Diffusion")
        .create_option(|option| {
            option
                .name("prompt")
                .description("What the image should show")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}
