//! Storyswap CLI - terminal client for the Storyswap storefront.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use storyswap_client::{ApiClient, ClientConfig, ConversationHandle, RegisterRequest};
use storyswap_core::{ProductId, Role, UserId};

/// Storyswap - browse, match, and chat about abandoned stories.
#[derive(Parser)]
#[command(name = "storyswap")]
#[command(about = "CLI for the Storyswap storefront", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "STORYSWAP_URL", default_value = "http://localhost:4000")]
    url: String,

    /// Bearer token (falls back to the token file written by `login`)
    #[arg(long, env = "STORYSWAP_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the bearer token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Register a new account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Account role: buyer or seller
        #[arg(short, long, default_value = "buyer")]
        role: String,
    },

    /// Show the authenticated profile
    Profile,

    /// List stories for sale
    Stories,

    /// Swipe right on a story (creates a match)
    Swipe {
        /// Product ID
        id: String,
    },

    /// List matches for one of your stories
    Matches {
        /// Product ID
        id: String,
    },

    /// Open a chat with another user
    Chat {
        /// Peer user ID
        peer: String,

        /// Product the conversation is about
        #[arg(long)]
        product: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("storyswap=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.url.clone());

    match cli.command {
        Commands::Login { email, password } => {
            login(&config, email, password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            register(&config, name, email, password, role).await?;
        }
        Commands::Profile => {
            profile(authenticated(&config, cli.token)?).await?;
        }
        Commands::Stories => {
            stories(authenticated(&config, cli.token)?).await?;
        }
        Commands::Swipe { id } => {
            swipe(authenticated(&config, cli.token)?, id).await?;
        }
        Commands::Matches { id } => {
            matches(authenticated(&config, cli.token)?, id).await?;
        }
        Commands::Chat { peer, product } => {
            let token = stored_token(cli.token).ok_or("not logged in; run `storyswap login` first")?;
            chat(config, token, peer, product).await?;
        }
    }

    Ok(())
}

fn token_file() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".storyswap-token")
}

fn stored_token(flag: Option<String>) -> Option<String> {
    flag.or_else(|| {
        std::fs::read_to_string(token_file())
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

fn authenticated(config: &ClientConfig, flag: Option<String>) -> Result<ApiClient, Box<dyn Error>> {
    let token = stored_token(flag).ok_or("not logged in; run `storyswap login` first")?;
    Ok(ApiClient::new(&config.base_url).with_token(token))
}

async fn login(config: &ClientConfig, email: String, password: String) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(&config.base_url);
    let response = client.login(&email, &password).await?;

    let path = token_file();
    std::fs::write(&path, &response.token)?;

    if let Some(user) = response.user {
        println!("Logged in as {} ({})", user.name, user.id);
    } else {
        println!("Logged in");
    }
    println!("Token stored in {}", path.display());
    Ok(())
}

async fn register(
    config: &ClientConfig,
    name: String,
    email: String,
    password: String,
    role: String,
) -> Result<(), Box<dyn Error>> {
    let role = match role.as_str() {
        "buyer" => Role::Buyer,
        "seller" => Role::Seller,
        other => return Err(format!("role must be buyer or seller, got '{other}'").into()),
    };

    let client = ApiClient::new(&config.base_url);
    client
        .register(&RegisterRequest {
            name,
            email,
            password,
            role,
        })
        .await?;

    println!("Account created. Log in with `storyswap login`.");
    Ok(())
}

async fn profile(client: ApiClient) -> Result<(), Box<dyn Error>> {
    let profile = client.profile().await?;
    println!("ID:    {}", profile.id);
    println!("Name:  {}", profile.name);
    if let Some(email) = &profile.email {
        println!("Email: {}", email);
    }
    println!("Role:  {:?}", profile.role);
    Ok(())
}

async fn stories(client: ApiClient) -> Result<(), Box<dyn Error>> {
    let products = client.products().await?;

    if products.is_empty() {
        println!("No stories listed.");
        return Ok(());
    }

    for product in products {
        let price = product
            .price
            .map(|p| format!("${p:.2}"))
            .unwrap_or_else(|| "unpriced".to_string());
        let seller = product
            .seller
            .as_ref()
            .map(|s| format!(" @{}", s.name))
            .unwrap_or_default();
        println!("{}  {} ({}){}", product.id, product.title, price, seller);
        if let Some(description) = &product.description {
            println!("    {}", description);
        }
        if !product.tags.is_empty() {
            println!("    tags: {}", product.tags.join(", "));
        }
    }
    Ok(())
}

async fn swipe(client: ApiClient, id: String) -> Result<(), Box<dyn Error>> {
    let match_id = client.create_match(&ProductId::new(id)).await?;
    println!("Match created: {}", match_id);
    Ok(())
}

async fn matches(client: ApiClient, id: String) -> Result<(), Box<dyn Error>> {
    let list = client.matches(&ProductId::new(id)).await?;
    println!("{} match(es)", list.count);

    for entry in list.matches {
        let who = entry
            .matcher
            .as_ref()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        let responded = if entry.responded_by_owner {
            "responded"
        } else {
            "pending"
        };
        println!(
            "{}  {}  {}  ({})",
            entry.match_id,
            who,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            responded
        );
    }
    Ok(())
}

async fn chat(
    config: ClientConfig,
    token: String,
    peer: String,
    product: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let peer = UserId::new(peer);
    let product = product.map(ProductId::new);

    // Show who we are talking to before opening the conversation.
    let api = ApiClient::new(&config.base_url).with_token(token.clone());
    match api.user(&peer).await {
        Ok(profile) => println!("Chatting with {}", profile.name),
        Err(e) => debug!(error = %e, "could not fetch peer profile"),
    }

    println!("Connecting to chat...");
    let handle = ConversationHandle::open(config, token, peer, product);

    let mut phases = handle.phase_updates();
    if phases.wait_for(|p| p.is_ready()).await.is_err() {
        // The runtime stalled in a gate and gave up its watch channels.
        return Err("could not connect to chat".into());
    }
    println!("Connected. Type a message and press Enter; /quit to leave.");

    let mut messages = handle.message_updates();
    let mut printed = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let visible = messages.borrow().clone();
                // A poll replace can shrink or rewrite the list.
                if visible.len() < printed {
                    printed = visible.len();
                }
                for message in &visible[printed..] {
                    println!(
                        "[{}] {}: {}",
                        message.created_at.format("%H:%M"),
                        message.sender_name,
                        message.content
                    );
                }
                printed = visible.len();
            }

            line = lines.next_line() => match line? {
                Some(line) if line.trim() == "/quit" => break,
                Some(line) => handle.send(&line).await,
                None => break,
            }
        }
    }

    handle.close();
    println!("Left the chat.");
    Ok(())
}
