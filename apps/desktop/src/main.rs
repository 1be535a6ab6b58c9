use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::TaskSyncClient;
use shared::domain::{Task, TaskId};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current task list.
    List,
    /// Create a task with the given title.
    Add { title: String },
    /// Flip completion for the task with the given id.
    Toggle { id: String },
    /// Delete the task with the given id.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let client = TaskSyncClient::new(cli.server_url);
    client.load_all().await?;

    match cli.command {
        Command::List => {}
        Command::Add { title } => match client.create(&title).await? {
            Some(created) => println!("Created task {}", created.id),
            None => println!("Nothing to add: title is empty"),
        },
        Command::Toggle { id } => {
            let completed = client.toggle(&TaskId::new(id)).await?;
            println!("Task is now {}", if completed { "done" } else { "open" });
        }
        Command::Delete { id } => {
            client.delete(&TaskId::new(id)).await?;
            println!("Task deleted");
        }
    }

    let snapshot = client.snapshot().await;
    render(&snapshot.tasks);
    Ok(())
}

fn render(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet.");
        return;
    }
    for task in tasks {
        let mark = if task.completed { "x" } else { " " };
        println!("[{mark}] {}  {}", task.id, task.title);
    }
}
