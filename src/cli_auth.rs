use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

mod cli_style;
mod sqlite_persistence;
mod user;

use cli_style::get_styles;
use user::{SqliteUserStore, UserManager, UserRole};

use rustyline::{
    completion::Completer, highlight::Highlighter, hint::Hinter, history::FileHistory,
    validate::Validator, CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the SQLite user database file.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates an account with the given email and password.
    /// The role defaults to "user"; pass "admin" for an admin account.
    AddUser {
        email: String,
        password: String,
        role: Option<String>,
    },

    /// Changes an account's password.
    SetPassword { email: String, password: String },

    /// Verifies the password of a given account. It doesn't make any
    /// persistent change, nor does it create any token, it just
    /// compares the password hash.
    CheckPassword { email: String, password: String },

    /// Changes an account's role ("admin" or "user").
    SetRole { email: String, role: String },

    /// Shows an account and its session tokens.
    Show { email: String },

    /// Lists all accounts.
    ListUsers,

    /// Shows the path of the current user db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn parse_role(role: Option<&str>) -> Result<UserRole, String> {
    match role {
        None => Ok(UserRole::User),
        Some(s) => UserRole::from_str(s).ok_or_else(|| format!("Unknown role '{}'", s)),
    }
}

fn execute_command(
    line: String,
    user_manager: &UserManager,
    db_path: String,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::AddUser {
                    email,
                    password,
                    role,
                } => {
                    let role = match parse_role(role.as_deref()) {
                        Ok(role) => role,
                        Err(err) => return CommandExecutionResult::Error(err),
                    };
                    match user_manager.sign_up(&email, &password, None, role) {
                        Ok(user_id) => {
                            println!("Created {} account {} ({})", role.as_str(), email, user_id)
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::SetPassword { email, password } => {
                    if let Err(err) = user_manager.set_password(&email, &password) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("Password updated for {}", email);
                }
                InnerCommand::CheckPassword { email, password } => {
                    let msg = match user_manager.check_password(&email, &password) {
                        Ok(true) => "The password provided is correct!".to_string(),
                        Ok(false) => "Wrong password.".to_string(),
                        Err(err) => format!(
                            "Could not verify the password, something went wrong: {}",
                            err
                        ),
                    };
                    println!("{}", msg);
                }
                InnerCommand::SetRole { email, role } => {
                    let role = match parse_role(Some(&role)) {
                        Ok(role) => role,
                        Err(err) => return CommandExecutionResult::Error(err),
                    };
                    if let Err(err) = user_manager.set_role(&email, role) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("{} is now {}", email, role.as_str());
                }
                InnerCommand::Show { email } => {
                    match user_manager.get_user_by_email(&email) {
                        Ok(Some(user)) => println!("{:#?}", user),
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User {} not found.",
                                email
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                    match user_manager.get_user_tokens(&email) {
                        Ok(tokens) => {
                            println!("\nSession Tokens:");
                            if tokens.is_empty() {
                                println!("  (none)");
                            }
                            for token in tokens.iter() {
                                println!("{:#?}", token);
                            }
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::ListUsers => match user_manager.list_users() {
                    Ok(users) => {
                        for user in users {
                            println!("{}  {}  ({})", user.id, user.email, user.role.as_str());
                        }
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::Where => {
                    println!("{}", db_path);
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

struct ReplHelper {
    commands_names: Vec<String>,
}

impl ReplHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        ReplHelper { commands_names }
    }
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}
impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_db_path = cli_args.path;
    let user_store = Arc::new(SqliteUserStore::new(&user_db_path)?);
    let user_manager = UserManager::new(user_store);

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<ReplHelper, FileHistory>::with_config(config)?;

    let helper = ReplHelper::new();
    rl.set_helper(Some(helper));
    let _ = rl.clear_screen();

    loop {
        let readline = rl.readline(PROMPT);

        let _ = rl.clear_screen();
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(
                    line,
                    &user_manager,
                    user_db_path.display().to_string(),
                ) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {:?}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
