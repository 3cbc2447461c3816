//! Interactive Atlas menu, shown when no subcommand is given

use crate::commands::atlas::{
    AtlasContext, SetupOptions, handle_local, handle_logout, handle_setup, handle_url,
    handle_use_url,
};
use crate::prompt::Prompter;
use colored::Colorize;
use std::io::{self, BufRead};

pub async fn run<R: BufRead>(ctx: &AtlasContext, prompt: &mut Prompter<R>) -> anyhow::Result<()> {
    loop {
        println!();
        println!("{}", "MongoDB Atlas".cyan().bold());
        println!("1. Set up MongoDB Atlas");
        println!("2. Get MongoDB URL");
        println!("3. Log out from MongoDB Atlas");
        println!("4. Exit");

        let choice = match prompt.choose("Choose an option (1-4): ", 4) {
            Ok(choice) => choice,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let result = match choice {
            1 => setup_with_recovery(ctx, prompt).await,
            2 => handle_url(ctx, prompt, None).await.map(|_| ()),
            3 => handle_logout(ctx).await,
            _ => return Ok(()),
        };

        if let Err(e) = result {
            if is_input_closed(&e) {
                return Ok(());
            }
            report_error(&e);
        }
    }
}

/// Run setup; on failure let the user retry, enter a URL or fall back to local
async fn setup_with_recovery<R: BufRead>(
    ctx: &AtlasContext,
    prompt: &mut Prompter<R>,
) -> anyhow::Result<()> {
    loop {
        let error = match handle_setup(ctx, prompt, &SetupOptions::default()).await {
            Ok(_) => return Ok(()),
            Err(e) if is_input_closed(&e) => return Err(e),
            Err(e) => e,
        };

        report_error(&error);
        println!();
        println!("What would you like to do?");
        println!("1. Try again");
        println!("2. Enter a connection string manually");
        println!("3. Use local MongoDB");
        println!("4. Back to menu");

        match prompt.choose("Choose an option (1-4): ", 4)? {
            1 => continue,
            2 => return enter_manual_url(ctx, prompt).await,
            3 => return handle_local(ctx, None).await,
            _ => return Ok(()),
        }
    }
}

async fn enter_manual_url<R: BufRead>(
    ctx: &AtlasContext,
    prompt: &mut Prompter<R>,
) -> anyhow::Result<()> {
    loop {
        let uri = prompt.ask_required("Enter your MongoDB connection string: ")?;
        match handle_use_url(ctx, &uri, None).await {
            Ok(()) => return Ok(()),
            Err(e) => report_error(&e),
        }
    }
}

fn is_input_closed(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::UnexpectedEof)
}

fn report_error(err: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
}
