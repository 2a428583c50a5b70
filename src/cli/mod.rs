use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{LedgerError, LedgerStore};
use crate::domain::{
    Bank, TxnDraft, TxnKind, TxnPatch, coerce_amount_str, dates, display_date, format_amount,
};
use crate::storage::{KeyValueStore, SqliteStore};

/// Khata - Bank and Transaction Ledger
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "A local-first ledger of banks, income, expenses and transfers")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "khata.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bank management commands
    #[command(subcommand)]
    Bank(BankCommands),

    /// Transaction management commands
    #[command(subcommand)]
    Txn(TxnCommands),

    /// Record a transfer between banks
    Transfer {
        /// Amount to transfer (e.g., "500" or "499.50")
        amount: String,

        /// Source bank (id or name)
        #[arg(long)]
        from: Option<String>,

        /// Destination bank (id or name)
        #[arg(long)]
        to: Option<String>,

        /// Date of the transfer (DD-MM-YYYY or ISO 8601, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Notes
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// Show total income, expense and net
    Totals,

    /// Show balances for every bank
    Balances,

    /// Discard all data and start over with the default banks
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Export data to JSON or CSV
    Export {
        /// Format: json (full ledger), txns (CSV), balances (CSV)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replace the ledger with a JSON export
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BankCommands {
    /// Add a new bank
    Add {
        /// Bank name
        name: String,

        /// Opening balance
        #[arg(short, long, default_value = "0")]
        opening: String,
    },

    /// Rename a bank
    Rename {
        /// Bank id or current name
        bank: String,

        /// New name
        name: String,
    },

    /// Remove a bank (its transactions become unassigned)
    Remove {
        /// Bank id or name
        bank: String,
    },

    /// List all banks
    List,
}

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record income or an expense
    Add {
        /// Amount (e.g., "250" or "99.90")
        amount: String,

        /// Type: income, expense
        #[arg(short = 't', long = "type", default_value = "income")]
        kind: String,

        /// Bank id or name
        #[arg(short, long)]
        bank: Option<String>,

        /// Category (e.g., "groceries", "salary")
        #[arg(short, long)]
        category: Option<String>,

        /// Notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Date (DD-MM-YYYY or ISO 8601, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change fields of an existing transaction
    Update {
        /// Transaction id
        id: String,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// New type: income, expense, transfer
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// New bank id or name
        #[arg(short, long, conflicts_with = "clear_bank")]
        bank: Option<String>,

        /// Unassign the transaction from its bank
        #[arg(long)]
        clear_bank: bool,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,

        /// New date
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction id
        id: String,
    },

    /// List transactions
    List {
        /// Only transactions tied to this bank (id or name)
        #[arg(short, long)]
        bank: Option<String>,

        /// Maximum number of transactions to show (most recent first)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let storage = SqliteStore::open(&self.database)
            .with_context(|| format!("Failed to open ledger database: {}", self.database))?;
        let mut store = LedgerStore::open(storage);

        match self.command {
            Commands::Bank(cmd) => run_bank_command(&mut store, cmd)?,

            Commands::Txn(cmd) => run_txn_command(&mut store, cmd)?,

            Commands::Transfer {
                amount,
                from,
                to,
                date,
                notes,
            } => {
                let from = from.map(|b| resolve_bank(&store, &b)).transpose()?;
                let to = to.map(|b| resolve_bank(&store, &b)).transpose()?;
                let amount_value = coerce_amount_str(&amount);

                let txn = store
                    .transfer(
                        from.as_ref().map(|b| b.id.as_str()),
                        to.as_ref().map(|b| b.id.as_str()),
                        amount_value,
                        date.as_deref(),
                        &notes,
                    )
                    .ok_or_else(|| {
                        LedgerError::InvalidAmount(format!("'{}' must be greater than zero", amount))
                    })?;

                println!(
                    "Recorded transfer: {} {} -> {} ({})",
                    format_amount(txn.amount),
                    bank_label(from.as_ref()),
                    bank_label(to.as_ref()),
                    txn.id
                );
            }

            Commands::Totals => {
                let totals = store.totals();
                println!("Income:   {:>16}", format_amount(totals.income));
                println!("Expense:  {:>16}", format_amount(totals.expense));
                println!("{}", "-".repeat(26));
                println!("Net:      {:>16}", format_amount(totals.net));
            }

            Commands::Balances => run_balances_command(&store),

            Commands::Reset { yes } => {
                if !yes {
                    anyhow::bail!("Refusing to reset without --yes");
                }
                store.reset_to_default();
                println!("Ledger reset to default banks");
            }

            Commands::Export { format, output } => {
                run_export_command(&store, &format, output.as_deref())?;
            }

            Commands::Import { input } => {
                run_import_command(&mut store, input.as_deref())?;
            }
        }

        Ok(())
    }
}

/// Resolve a bank by id first, then by exact name.
fn resolve_bank<S: KeyValueStore>(store: &LedgerStore<S>, key: &str) -> Result<Bank> {
    store
        .find_bank(key)
        .or_else(|| store.find_bank_by_name(key))
        .ok_or_else(|| LedgerError::BankNotFound(key.to_string()).into())
}

fn bank_label(bank: Option<&Bank>) -> &str {
    bank.map(|b| b.name.as_str()).unwrap_or("(unassigned)")
}

/// The stored name after a rename, which is unchanged for a blank request.
fn rename_summary(before: &Bank, after: &Bank) -> String {
    format!("Renamed bank: {} -> {}", before.name, after.name)
}

fn parse_amount_arg(input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| LedgerError::InvalidAmount(input.to_string()).into())
}

fn run_bank_command<S: KeyValueStore>(store: &mut LedgerStore<S>, cmd: BankCommands) -> Result<()> {
    match cmd {
        BankCommands::Add { name, opening } => {
            let opening = parse_amount_arg(&opening)?;
            let bank = store.add_bank(&name, opening);
            println!(
                "Created bank: {} (opening {}, id {})",
                bank.name,
                format_amount(bank.opening),
                bank.id
            );
        }
        BankCommands::Rename { bank, name } => {
            let target = resolve_bank(store, &bank)?;
            store.rename_bank(&target.id, &name);
            let renamed = store
                .find_bank(&target.id)
                .ok_or_else(|| LedgerError::BankNotFound(target.id.clone()))?;
            println!("{}", rename_summary(&target, &renamed));
        }
        BankCommands::Remove { bank } => {
            let target = resolve_bank(store, &bank)?;
            store.remove_bank(&target.id);
            println!("Removed bank: {}", target.name);
        }
        BankCommands::List => {
            let banks = store.list_banks();
            if banks.is_empty() {
                println!("No banks found.");
            } else {
                println!("{:<36} {:<24} {:>14}", "ID", "NAME", "OPENING");
                println!("{}", "-".repeat(76));
                for bank in banks {
                    println!(
                        "{:<36} {:<24} {:>14}",
                        bank.id,
                        bank.name,
                        format_amount(bank.opening)
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_txn_command<S: KeyValueStore>(store: &mut LedgerStore<S>, cmd: TxnCommands) -> Result<()> {
    match cmd {
        TxnCommands::Add {
            amount,
            kind,
            bank,
            category,
            notes,
            date,
        } => {
            let amount = parse_amount_arg(&amount)?;
            let mut draft = TxnDraft::new(kind, amount);
            if let Some(bank) = bank {
                draft = draft.with_bank(resolve_bank(store, &bank)?.id);
            }
            draft.category = category;
            draft.notes = notes;
            draft.date = date;

            let txn = store.add_txn(draft);
            println!(
                "Recorded {}: {} on {} ({})",
                txn.kind,
                format_amount(txn.amount),
                display_date(&txn.date),
                txn.id
            );
        }
        TxnCommands::Update {
            id,
            amount,
            kind,
            bank,
            clear_bank,
            category,
            notes,
            date,
        } => {
            let bank_id = match (bank, clear_bank) {
                (Some(bank), _) => Some(Some(resolve_bank(store, &bank)?.id)),
                (None, true) => Some(None),
                (None, false) => None,
            };
            let patch = TxnPatch {
                date: date.as_deref().map(|d| dates::parse_date(d)),
                kind: kind.as_deref().map(TxnKind::coerce),
                amount: amount.as_deref().map(parse_amount_arg).transpose()?,
                category,
                notes,
                bank_id,
                ..Default::default()
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            if !store.update_txn(&id, patch) {
                return Err(LedgerError::TransactionNotFound(id).into());
            }
            println!("Updated transaction: {}", id);
        }
        TxnCommands::Delete { id } => {
            if !store.delete_txn(&id) {
                return Err(LedgerError::TransactionNotFound(id).into());
            }
            println!("Deleted transaction: {}", id);
        }
        TxnCommands::List { bank, limit } => {
            let state = store.state();
            let filter = bank.map(|b| resolve_bank(store, &b)).transpose()?;

            let mut txns: Vec<_> = state
                .txns
                .iter()
                .filter(|t| match &filter {
                    Some(b) => t.bank_id.as_deref() == Some(b.id.as_str()) || t.touches_bank(&b.id),
                    None => true,
                })
                .collect();
            txns.sort_by(|a, b| b.date.cmp(&a.date));
            if let Some(limit) = limit {
                txns.truncate(limit);
            }

            if txns.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let name_of = |id: &Option<String>| {
                id.as_deref()
                    .map(|id| state.bank(id).map(|b| b.name.as_str()).unwrap_or("(removed)"))
                    .unwrap_or("-")
                    .to_string()
            };

            println!(
                "{:<10} {:<36} {:<8} {:>14} {:<16} {:<24}",
                "DATE", "ID", "TYPE", "AMOUNT", "CATEGORY", "BANK"
            );
            println!("{}", "-".repeat(113));
            for t in txns {
                let bank = if t.is_transfer() {
                    format!("{} -> {}", name_of(&t.from_bank), name_of(&t.to_bank))
                } else {
                    name_of(&t.bank_id)
                };
                println!(
                    "{:<10} {:<36} {:<8} {:>14} {:<16} {:<24}",
                    display_date(&t.date),
                    t.id,
                    t.kind,
                    format_amount(t.amount),
                    t.category,
                    bank
                );
            }
        }
    }
    Ok(())
}

fn run_balances_command<S: KeyValueStore>(store: &LedgerStore<S>) {
    let balances = store.balances_per_bank();
    if balances.is_empty() {
        println!("No banks found.");
        return;
    }

    println!(
        "{:<24} {:>14} {:>14} {:>14} {:>14} {:>6}",
        "BANK", "OPENING", "INCOME", "EXPENSE", "BALANCE", "TXNS"
    );
    println!("{}", "-".repeat(91));
    for b in balances {
        println!(
            "{:<24} {:>14} {:>14} {:>14} {:>14} {:>6}",
            b.name,
            format_amount(b.opening),
            format_amount(b.income),
            format_amount(b.expense),
            format_amount(b.balance),
            b.count
        );
    }
}

fn run_export_command<S: KeyValueStore>(
    store: &LedgerStore<S>,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(store);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match format {
        "json" => {
            let snapshot = exporter.export_full_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported ledger: {} banks, {} transactions",
                    snapshot.state.banks.len(),
                    snapshot.state.txns.len()
                );
            }
        }
        "txns" => {
            let count = exporter.export_txns_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export format '{}'. Valid formats: json, txns, balances",
                format
            );
        }
    }

    Ok(())
}

fn run_import_command<S: KeyValueStore>(
    store: &mut LedgerStore<S>,
    input: Option<&str>,
) -> Result<()> {
    use std::io::{Read, stdin};

    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path))?,
        None => {
            let mut buf = String::new();
            stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    if !store.import_json(&text)? {
        return Err(LedgerError::EmptyImport.into());
    }

    let state = store.state();
    println!("Import complete");
    println!("  Banks:        {}", state.banks.len());
    println!("  Transactions: {}", state.txns.len());
    Ok(())
}
