//! View loop for the terminal client.
//!
//! Views mirror the routes: `Sign` asks for credentials, `Portal` lists
//! schemas and runs the chat. Every transition goes through the navigation
//! guard, and a confirmed re-authentication prompt restarts the loop from
//! the entry route.

use anyhow::Result;
use tracing::{debug, info};

use bankbot_core::i18n::{self, MessageKey};
use bankbot_core::models::{ChatLine, SchemaOption};
use bankbot_core::router::SIGN_ROUTE;
use bankbot_core::{ClientContext, NavTarget, SessionEvent};

use crate::terminal::{read_line, read_password};

/// Query parameter naming the schema a portal view has open
const SCHEMA_QUERY: &str = "schema";

enum Flow {
    /// Move to another view (subject to the guard)
    Go(NavTarget),
    /// Start over from the entry route
    Restart,
    Quit,
}

pub struct App {
    ctx: ClientContext,
}

impl App {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let entry = self.ctx.guard.routes().home().target();
            let mut current = self.ctx.guard.navigate(entry);
            info!(route = %current.full_path(), "Starting");

            loop {
                let flow = if current.name == SIGN_ROUTE {
                    self.sign_in_view(&current).await?
                } else {
                    self.portal_view(&current).await?
                };

                match flow {
                    Flow::Go(next) => current = self.ctx.guard.navigate(next),
                    Flow::Restart => break,
                    Flow::Quit => return Ok(()),
                }
            }
        }
    }

    /// Wait for any open re-authentication prompt, then report whether it
    /// asked for a restart.
    async fn settle(&mut self) -> bool {
        self.ctx.api.reauth().wait_idle().await;
        let mut restart = false;
        while let Ok(event) = self.ctx.events.try_recv() {
            match event {
                SessionEvent::RestartRequested => restart = true,
            }
        }
        restart
    }

    fn text(&self, key: MessageKey) -> &'static str {
        i18n::text(&self.ctx.session().locale(), key)
    }

    async fn sign_in_view(&mut self, current: &NavTarget) -> Result<Flow> {
        println!();
        println!("== {} ==", self.text(MessageKey::ControlPanel));

        let Some(username) = read_line("Username: ").await? else {
            return Ok(Flow::Quit);
        };
        if username.is_empty() {
            return Ok(Flow::Go(current.clone()));
        }
        let password = read_password("Password: ").await?;

        let result = self.ctx.api.sign_in(&username, &password).await;
        match result {
            Ok(true) => {
                info!("Signed in");
                Ok(Flow::Go(self.ctx.guard.after_sign_in(current)))
            }
            Ok(false) => {
                eprintln!("✗ Sign-in was not accepted");
                Ok(Flow::Go(current.clone()))
            }
            Err(_) => {
                if self.settle().await {
                    Ok(Flow::Restart)
                } else {
                    Ok(Flow::Go(current.clone()))
                }
            }
        }
    }

    async fn portal_view(&mut self, current: &NavTarget) -> Result<Flow> {
        let schema = match current.query_value(SCHEMA_QUERY) {
            Some(schema) => schema.to_string(),
            None => match self.pick_schema(current).await? {
                Ok(option) => option.schema,
                Err(flow) => return Ok(flow),
            },
        };

        let chat = self
            .ctx
            .guard
            .routes()
            .home()
            .target()
            .with_query(SCHEMA_QUERY, schema.clone());
        if chat != *current {
            return Ok(Flow::Go(chat));
        }

        self.chat(current, &schema).await
    }

    /// Let the user choose a schema. `Err(flow)` when the view should be left.
    async fn pick_schema(
        &mut self,
        current: &NavTarget,
    ) -> Result<std::result::Result<SchemaOption, Flow>> {
        let result = self.ctx.api.fetch_options().await;
        let options = match result {
            Ok(options) => options,
            Err(_) => return Ok(Err(self.after_failure(current).await?)),
        };
        if options.is_empty() {
            eprintln!("✗ {}", self.text(MessageKey::ServiceError));
            return Ok(Err(Flow::Quit));
        }

        println!();
        println!("{}:", self.text(MessageKey::SelectSchema));
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, option.title);
        }

        loop {
            let Some(choice) = read_line("> ").await? else {
                return Ok(Err(Flow::Quit));
            };
            if choice == "q" {
                return Ok(Err(Flow::Quit));
            }
            match choice.parse::<usize>() {
                Ok(n) if n >= 1 && n <= options.len() => {
                    return Ok(Ok(options[n - 1].clone()));
                }
                _ => eprintln!("Enter a number between 1 and {}", options.len()),
            }
        }
    }

    async fn chat(&mut self, current: &NavTarget, schema: &str) -> Result<Flow> {
        let detail = self.ctx.api.fetch_detail(schema).await;
        match detail {
            Ok(detail) => {
                println!();
                println!("== {} ==", detail.title);
                if !detail.welcome.is_empty() {
                    println!("{}", detail.welcome);
                }
            }
            Err(_) => return self.after_failure(current).await,
        }

        let greeting = self.ctx.api.chat_init(schema).await;
        match greeting {
            Ok(lines) => print_lines(&lines),
            Err(_) => return self.after_failure(current).await,
        }

        println!("(/back to choose another schema, /lang <locale>, /quit)");
        loop {
            let Some(input) = read_line("> ").await? else {
                return Ok(Flow::Quit);
            };
            match input.as_str() {
                "" => continue,
                "/quit" => return Ok(Flow::Quit),
                "/back" => return Ok(Flow::Go(self.ctx.guard.routes().home().target())),
                cmd if cmd.starts_with("/lang ") => {
                    let locale = cmd.trim_start_matches("/lang ").trim();
                    self.ctx.session().set_locale(locale);
                    debug!(locale, "Locale changed");
                }
                content => {
                    let reply = self.ctx.api.chat_message(content).await;
                    match reply {
                        Ok(lines) => print_lines(&lines),
                        // Cancelled or plain failure: stay in this view
                        Err(_) => {
                            if self.settle().await {
                                return Ok(Flow::Restart);
                            }
                        }
                    }
                }
            }
        }
    }

    /// After a failed call outside the chat loop: restart if the user chose
    /// to sign in again, otherwise offer to retry the current view.
    async fn after_failure(&mut self, current: &NavTarget) -> Result<Flow> {
        if self.settle().await {
            return Ok(Flow::Restart);
        }
        let answer = read_line("Press Enter to retry, q to quit > ").await?;
        Ok(match answer.as_deref() {
            None | Some("q") => Flow::Quit,
            _ => Flow::Go(current.clone()),
        })
    }
}

fn print_lines(lines: &[ChatLine]) {
    for line in lines {
        println!("[{}] {}", line.time_display(), line.content);
    }
}
