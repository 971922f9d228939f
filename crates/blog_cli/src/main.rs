//! Command-line client for the blog RPC server.
//!
//! One subcommand per RPC; output mirrors what each call returns.

use blog_rpc::{Blog, BlogClient};
use clap::{Parser, Subcommand};
use std::error::Error;

/// Blog post RPC client.
#[derive(Parser)]
#[command(name = "blog_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server address
    #[arg(global = true, short, long, default_value = "127.0.0.1:8080")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a post; fails if the title is taken
    Create {
        title: String,
        author: String,
        content: String,
    },
    /// Show the post with this title and author
    Read { title: String, author: String },
    /// Replace the content of a post
    Update {
        title: String,
        author: String,
        content: String,
    },
    /// Delete a post (succeeds even if it does not exist)
    Delete { title: String, author: String },
    /// Stream every stored post
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut client = BlogClient::connect(cli.addr.as_str()).await?;

    match cli.command {
        Commands::Create {
            title,
            author,
            content,
        } => {
            let blog = client.create_blog(title, author, content).await?;
            if let Some(id) = blog.id {
                println!("Id: {id}");
            }
            print_blog(&blog);
        }
        Commands::Read { title, author } => {
            print_blog(&client.read_blog(title, author).await?);
        }
        Commands::Update {
            title,
            author,
            content,
        } => {
            print_blog(&client.update_blog(title, author, content).await?);
        }
        Commands::Delete { title, author } => {
            println!("{}", client.delete_blog(title, author).await?);
        }
        Commands::List => {
            let mut stream = client.list_blogs().await?;
            let mut count = 0usize;
            while let Some(blog) = stream.message().await? {
                print_blog(&blog);
                println!();
                count += 1;
            }
            println!("Received all present blogs ({count}).");
        }
    }

    Ok(())
}

fn print_blog(blog: &Blog) {
    println!("Title: {}", blog.title);
    println!("by: {}", blog.author);
    println!("Content: {}", blog.content);
}
