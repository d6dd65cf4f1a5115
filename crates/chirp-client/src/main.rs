//! Interactive line client.
//!
//! Reads a command name, prompts for each field, opens a fresh
//! connection per command and prints the outcome. Credentials from the
//! last successful signin are attached to authenticated commands.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;
use tracing::debug;

use chirp_types::api::{AuthPayload, Reply, Request};
use chirp_types::wire;

/// Chirp interactive client.
#[derive(Parser)]
#[command(name = "chirp-client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long)]
    server_host: String,

    #[arg(long, default_value_t = 8080)]
    server_port: u16,
}

type Input = Lines<BufReader<Stdin>>;

struct Session {
    host: String,
    port: u16,
    /// Set by a successful signin and replaced by the next one.
    credentials: Option<AuthPayload>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut session = Session {
        host: cli.server_host,
        port: cli.server_port,
        credentials: None,
    };
    session.run().await
}

impl Session {
    async fn run(&mut self) -> Result<()> {
        let mut input = BufReader::new(tokio::io::stdin()).lines();

        loop {
            println!("Enter command name:");
            let Some(command) = input.next_line().await? else {
                break;
            };
            let command = command.trim().to_string();
            if command.is_empty() {
                continue;
            }
            if command == "exit" {
                println!("Exiting");
                break;
            }

            // One failed command never ends the session.
            if let Err(e) = self.dispatch(&command, &mut input).await {
                debug!("command {command} failed: {e:#}");
                println!("Something went wrong");
            }
        }

        Ok(())
    }

    async fn dispatch(&mut self, command: &str, input: &mut Input) -> Result<()> {
        match command {
            "signup" => self.signup(input).await,
            "signin" => self.signin(input).await,
            "post" => self.post(input).await,
            "follow" => self.follow(input).await,
            "unfollow" => self.unfollow(input).await,
            "like" => self.like(input).await,
            "get_user_posts" => self.get_user_posts(input).await,
            "get_user_feed" => self.get_user_feed().await,
            "get_followed_users" => self.get_followed_users(input).await,
            "get_following_users" => self.get_following_users(input).await,
            "admin" => self.admin().await,
            _ => {
                println!("Bad command");
                Ok(())
            }
        }
    }

    /// Credentials for an authenticated command, or `None` (with a hint
    /// printed) when the user has not signed in yet.
    fn credentials(&self) -> Option<AuthPayload> {
        let credentials = self.credentials.clone();
        if credentials.is_none() {
            println!("You should signin first");
        }
        credentials
    }

    async fn signup(&mut self, input: &mut Input) -> Result<()> {
        let username = prompt(input, "username").await?;
        let password = prompt(input, "password").await?;

        let reply = self
            .exchange(&Request::Signup {
                username: username.clone(),
                password,
            })
            .await?;

        if reply.code == 200 {
            println!("User {username} registered");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn signin(&mut self, input: &mut Input) -> Result<()> {
        let username = prompt(input, "username").await?;
        let password = prompt(input, "password").await?;

        let reply = self
            .exchange(&Request::Signin {
                username: username.clone(),
                password,
            })
            .await?;

        if reply.code == 200 {
            let auth_token = reply.data["auth_token"]
                .as_str()
                .context("signin reply carried no token")?
                .to_string();
            self.credentials = Some(AuthPayload {
                username: username.clone(),
                auth_token,
            });
            println!("User {username} logged in");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn post(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let text = prompt(input, "text").await?;

        let reply = self.exchange(&Request::Post { auth, text }).await?;
        if reply.code == 200 {
            println!("Post successful");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn follow(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let user_to_follow = prompt(input, "user_to_follow").await?;

        let reply = self
            .exchange(&Request::Follow {
                auth,
                user_to_follow: user_to_follow.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("Followed {user_to_follow}");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn unfollow(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let user_to_unfollow = prompt(input, "user_to_unfollow").await?;

        let reply = self
            .exchange(&Request::Unfollow {
                auth,
                user_to_unfollow: user_to_unfollow.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("Unfollowed {user_to_unfollow}");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn like(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let post_id = prompt(input, "post_id").await?;

        let reply = self
            .exchange(&Request::Like {
                auth,
                post_id: post_id.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("Liked {post_id}");
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn get_user_posts(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let username = prompt(input, "username").await?;

        let reply = self
            .exchange(&Request::GetUserPosts {
                auth,
                username: username.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("Posts of user {username}:");
            print_items(&reply.data);
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn get_user_feed(&mut self) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };

        let reply = self.exchange(&Request::GetUserFeed { auth }).await?;
        if reply.code == 200 {
            println!("Posts feed:");
            print_items(&reply.data);
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn get_followed_users(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let username = prompt(input, "username").await?;

        let reply = self
            .exchange(&Request::GetFollowedUsers {
                auth,
                username: username.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("{username} follows:");
            print_items(&reply.data);
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn get_following_users(&mut self, input: &mut Input) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };
        let username = prompt(input, "username").await?;

        let reply = self
            .exchange(&Request::GetFollowingUsers {
                auth,
                username: username.clone(),
            })
            .await?;
        if reply.code == 200 {
            println!("Followers of {username}:");
            print_items(&reply.data);
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    async fn admin(&mut self) -> Result<()> {
        let Some(auth) = self.credentials() else {
            return Ok(());
        };

        let reply = self.exchange(&Request::Admin { auth }).await?;
        if reply.code == 200 {
            println!("{}", serde_json::to_string_pretty(&reply.data)?);
        } else {
            print_error(&reply);
        }
        Ok(())
    }

    /// One connection per command: connect, send, await the single
    /// reply line.
    async fn exchange(&self, request: &Request) -> Result<Reply> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .context("failed to connect to server")?;
        let (reader, mut writer) = stream.into_split();

        let mut encoded = wire::encode(request)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;

        let line = BufReader::new(reader)
            .lines()
            .next_line()
            .await?
            .context("server closed the connection without replying")?;
        Ok(wire::decode(&line)?)
    }
}

async fn prompt(input: &mut Input, field: &str) -> Result<String> {
    println!("Enter {field}:");
    let line = input
        .next_line()
        .await?
        .context("input closed mid-command")?;
    Ok(line.trim().to_string())
}

fn print_error(reply: &Reply) {
    println!("Error occurred: {}", reply.data);
}

fn print_items(data: &Value) {
    for item in data.as_array().map(Vec::as_slice).unwrap_or_default() {
        println!("{item}");
    }
}
