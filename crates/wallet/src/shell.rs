use crate::callback::CallbackServer;
use crate::flow::{FlowError, SaltPrompt};
use crate::state::WalletState;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use session::UserIdentity;
use std::time::Duration;
use sui::{ChainError, Direction, EpochSource, TokenBalance, TransactionRecord, TransferRequest, TxStatus};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, error};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
const PIN_ATTEMPTS: usize = 3;

#[derive(Parser)]
#[command(name = "wallet", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Sign in with Google
    Login {
        /// Paste the redirect URL instead of running the local listener
        #[arg(long)]
        manual: bool,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show token balances
    Balances,
    /// Show recent transactions
    History,
    /// Send tokens
    Send {
        recipient: String,
        amount: String,
        /// Coin type, defaults to SUI
        #[arg(long)]
        coin: Option<String>,
    },
    /// Quote a swap between two known tokens
    Swap { from: String, to: String, amount: String },
    /// Show the current epoch and session expiry
    Epoch,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

pub fn print_identity(identity: Option<&UserIdentity>) {
    match identity {
        Some(user) => {
            println!("{} {}", "Address:".bold(), user.address.green());
            if let Some(name) = &user.name {
                println!("{} {}", "Name:   ".bold(), name);
            }
            if let Some(email) = &user.email {
                println!("{} {}", "Email:  ".bold(), email);
            }
            println!("{} {}", "Login:  ".bold(), user.provider);
        }
        None => println!("{}", "Not signed in. Run `login` to connect.".yellow()),
    }
}

pub fn print_balances(result: &Result<Vec<TokenBalance>, ChainError>) {
    match result {
        Ok(balances) if balances.is_empty() => println!("{}", "No tokens held at this address.".yellow()),
        Ok(balances) => {
            println!(
                "{:<8} {:<16} {:>20} {:>12} {:>10}",
                "Symbol".bold(),
                "Name".bold(),
                "Balance".bold(),
                "USD".bold(),
                "Price".bold()
            );
            for b in balances {
                println!(
                    "{:<8} {:<16} {:>20} {:>12} {:>10}",
                    b.symbol.cyan(),
                    b.name,
                    b.balance,
                    format!("${}", b.usd_value),
                    format!("${}", b.price)
                );
            }
        }
        Err(e) => println!("{} {}", "Could not load balances:".red(), e),
    }
}

fn short(address: &str) -> String {
    if address.len() > 14 {
        format!("{}...{}", &address[..8], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

pub fn print_history(result: &Result<Vec<TransactionRecord>, ChainError>) {
    match result {
        Ok(history) if history.is_empty() => println!("{}", "No transactions yet.".yellow()),
        Ok(history) => {
            for tx in history {
                let when = tx
                    .datetime()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let (arrow, party) = match tx.direction {
                    Direction::Sent => ("sent".red(), format!("to {}", short(&tx.to))),
                    Direction::Received => ("recv".green(), format!("from {}", short(&tx.from))),
                };
                let status = match tx.status {
                    TxStatus::Completed => "ok".green(),
                    TxStatus::Pending => "pending".yellow(),
                    TxStatus::Failed => "failed".red(),
                };
                println!(
                    "{} {:<4} {:>14} {:<6} {:<22} fee {} SUI [{}] {}",
                    when,
                    arrow,
                    tx.amount,
                    tx.symbol,
                    party,
                    tx.fee,
                    status,
                    short(&tx.digest).dimmed()
                );
            }
        }
        Err(e) => println!("{} {}", "Could not load transactions:".red(), e),
    }
}

/// Where PIN entries come from.
#[async_trait]
pub trait PinSource: Send {
    async fn read_pin(&mut self, prompt: &str) -> Result<String>;
}

/// Hidden terminal input, read on the blocking pool.
pub struct TerminalPins;

#[async_trait]
impl PinSource for TerminalPins {
    async fn read_pin(&mut self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        Ok(tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await??)
    }
}

/// Interactive wallet session; lives as long as the process.
pub struct Shell {
    state: WalletState,
    lines: Lines<BufReader<Stdin>>,
    pins: Box<dyn PinSource>,
    manual_default: bool,
}

impl Shell {
    pub fn new(state: WalletState, manual_default: bool) -> Self {
        Self::with_pins(state, manual_default, Box::new(TerminalPins))
    }

    pub fn with_pins(state: WalletState, manual_default: bool, pins: Box<dyn PinSource>) -> Self {
        Self {
            state,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            pins,
            manual_default,
        }
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?)
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "Sui zkLogin wallet".bold().blue());
        println!("Network: {}. Type `help` for commands.", self.state.config.network);
        print_identity(self.state.auth().user());

        while let Some(line) = self.read_line("wallet> ").await? {
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let command = match ShellLine::try_parse_from(words) {
                Ok(parsed) => parsed.command,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };
            if matches!(command, ShellCommand::Exit) {
                break;
            }
            if let Err(e) = self.dispatch(command).await {
                debug!("Command failed: {:?}", e);
                println!("{} {}", "Error:".red().bold(), e);
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Login { manual } => self.login(manual || self.manual_default).await,
            ShellCommand::Logout => {
                self.state.logout();
                println!("{}", "Signed out.".green());
                Ok(())
            }
            ShellCommand::Whoami => {
                print_identity(self.state.auth().user());
                if self.state.auth().is_authenticated() && !self.state.session.is_valid() {
                    println!("{}", "No signing session in this shell; run `login` to send.".yellow());
                }
                Ok(())
            }
            ShellCommand::Balances => {
                let address = self.address()?;
                print_balances(&self.state.chain.fetch_balances(&address).await);
                Ok(())
            }
            ShellCommand::History => {
                let address = self.address()?;
                print_history(&self.state.chain.fetch_transactions(&address).await);
                Ok(())
            }
            ShellCommand::Send { recipient, amount, coin } => self.send(recipient, amount, coin).await,
            ShellCommand::Swap { from, to, amount } => self.swap(&from, &to, &amount).await,
            ShellCommand::Epoch => {
                let epoch = self.state.chain.current_epoch().await?;
                println!("Current epoch: {}", epoch);
                if let Some(max_epoch) = self.state.session.max_epoch() {
                    println!("Session valid through epoch {}", max_epoch);
                }
                Ok(())
            }
            ShellCommand::Exit => Ok(()),
        }
    }

    fn address(&self) -> Result<String> {
        self.state
            .auth()
            .user()
            .map(|u| u.address.clone())
            .ok_or_else(|| anyhow!("not signed in, run `login` first"))
    }

    async fn login(&mut self, manual: bool) -> Result<()> {
        self.state.config.validate_login()?;
        let origin = self.state.config.origin()?;

        // Listen before sending the user away so the redirect cannot be missed
        let server = if manual {
            None
        } else {
            Some(CallbackServer::start(self.state.config.callback_port).await?)
        };

        let url = self.state.flow.begin(&self.state.chain, &origin).await?;
        println!("{}", "Open this URL in your browser to sign in with Google:".bold());
        println!("{}", url.as_str().underline());

        let redirect = match server {
            Some(server) => {
                println!("Waiting for the redirect...");
                server.wait(LOGIN_TIMEOUT).await
            }
            None => self
                .read_line("Paste the full redirect URL: ")
                .await
                .and_then(|line| line.ok_or_else(|| anyhow!("no redirect URL entered"))),
        };
        let redirect = match redirect {
            Ok(redirect) => redirect,
            Err(e) => {
                self.state.flow.cancel();
                return Err(e);
            }
        };

        let identity = self.finish_login(&redirect).await?;
        println!("{} {}", "Signed in as".green(), identity.address.green().bold());
        Ok(())
    }

    /// Everything after the redirect. Any error leaves the flow idle so `login` can be retried.
    async fn finish_login(&mut self, redirect: &str) -> Result<UserIdentity> {
        let result = self.drive_login(redirect).await;
        if result.is_err() {
            self.state.flow.cancel();
        }
        result
    }

    async fn drive_login(&mut self, redirect: &str) -> Result<UserIdentity> {
        self.state.flow.receive_callback(redirect)?;
        match self.state.flow.resolve_prompt(&self.state.registry, &self.state.session)? {
            SaltPrompt::Known => println!("Using the PIN entered earlier in this shell."),
            prompt => self.collect_secret(prompt).await?,
        }

        println!("Generating zero-knowledge proof...");
        let address = self.state.request_proof().await?;
        debug!("Proof ready for {}", address);

        Ok(self.state.complete_login()?)
    }

    async fn collect_secret(&mut self, prompt: SaltPrompt) -> Result<()> {
        if prompt == SaltPrompt::FirstTime {
            println!("{}", "Choose a 6-digit PIN. It selects your wallet address.".bold());
            println!(
                "{}",
                "The PIN cannot be recovered. A different PIN later opens a different, empty wallet.".yellow()
            );
        }

        for _ in 0..PIN_ATTEMPTS {
            let entry = self.pins.read_pin("PIN: ").await?;
            let confirmation = match prompt {
                SaltPrompt::FirstTime => Some(self.pins.read_pin("Confirm PIN: ").await?),
                SaltPrompt::Returning | SaltPrompt::Known => None,
            };
            match self.state.flow.submit_secret(&entry, confirmation.as_deref()) {
                Ok(()) => return Ok(()),
                Err(FlowError::Validation(message)) => println!("{} {}", "Invalid PIN:".red(), message),
                Err(e) => return Err(e.into()),
            }
        }

        Err(anyhow!("too many invalid PIN attempts"))
    }

    async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{} [y/N] ", question)).await?;
        Ok(matches!(answer.as_deref().map(str::trim), Some("y") | Some("Y") | Some("yes")))
    }

    async fn send(&mut self, recipient: String, amount: String, coin: Option<String>) -> Result<()> {
        let sender = self.address()?;
        let session = self
            .state
            .session
            .get()
            .ok_or_else(|| anyhow!("no signing session in this shell, run `login` first"))?;

        let request = TransferRequest {
            recipient,
            amount,
            coin_type: coin,
        };
        let question = format!("Send {} {} to {}?", request.amount, request.coin_type(), request.recipient);
        if !self.confirm(&question).await? {
            println!("Cancelled.");
            return Ok(());
        }

        match sui::sign_and_submit(&self.state.chain, &session, &sender, &request).await {
            Ok(digest) => {
                println!("{} {}", "Submitted:".green(), digest);
                Ok(())
            }
            Err(e) => {
                error!("Transfer failed: {}", e);
                Err(e.into())
            }
        }
    }

    async fn swap(&mut self, from: &str, to: &str, amount: &str) -> Result<()> {
        let quote = sui::quote_swap(from, to, amount)?;
        println!(
            "{} {} -> {} {} (about ${})",
            quote.amount_in, quote.from_symbol, quote.amount_out, quote.to_symbol, quote.usd_value
        );
        let session = self
            .state
            .session
            .get()
            .ok_or_else(|| anyhow!("no signing session in this shell, run `login` first"))?;
        sui::execute_swap(&self.state.chain, &session, &quote).await?;
        Ok(())
    }
}
