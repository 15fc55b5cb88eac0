//! Command handlers. Each one runs after `bootstrap()` has settled the session.

use std::io::{self, Write};

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use tracing::warn;

use fintrack_core::models::{
    Budget, BudgetDraft, BudgetPeriod, EntityId, PasswordChange, ProfileUpdate,
    RegistrationForm, Transaction, TransactionDraft, TransactionFilter, TransactionKind,
};
use fintrack_core::utils::{format_amount, format_date, truncate_string};
use fintrack_core::{ApiError, Config, FinanceApi, SessionManager};

pub struct Context {
    pub config: Config,
    pub session: SessionManager,
    pub api: FinanceApi,
}

impl Context {
    fn currency(&self) -> String {
        self.session
            .current_user()
            .map(|u| u.currency)
            .unwrap_or_else(|| "USD".to_string())
    }

    fn require_session(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not signed in. Run `fintrack login` first.");
        }
        Ok(())
    }
}

/// Turn an API failure into the message a user should see.
fn report(err: ApiError) -> anyhow::Error {
    anyhow::anyhow!(err.user_message())
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(d) => print!("{} [{}]: ", label, d),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim();
    if value.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(value.to_string())
    }
}

fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", label))?)
}

// ===== Session =====

pub async fn login(ctx: &mut Context, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => {
            let remembered = ctx.config.last_username.clone().or_else(|| {
                ctx.session
                    .cached_profile()
                    .and_then(|cached| cached.data.username)
            });
            prompt("Username", remembered.as_deref())?
        }
    };
    let password = prompt_password("Password")?;

    let user = ctx.session.login(&username, &password).await.map_err(report)?;

    ctx.config.last_username = Some(username);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {}", user.display_name());
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.session.logout();
    println!("Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    match ctx.session.current_user() {
        Some(user) => {
            println!("{}", user.display_name());
            if let Some(email) = &user.email {
                println!("  email:    {}", email);
            }
            println!("  currency: {}", user.currency);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn register(ctx: &Context) -> Result<()> {
    let form = RegistrationForm {
        username: prompt("Username", None)?,
        email: prompt("Email", None)?,
        password: prompt_password("Password")?,
        confirm_password: prompt_password("Confirm password")?,
    };

    ctx.session.register(&form).await.map_err(report)?;
    println!("Account created. Run `fintrack login` to sign in.");
    Ok(())
}

pub async fn update_profile(
    ctx: &Context,
    name: Option<String>,
    email: Option<String>,
    currency: Option<String>,
) -> Result<()> {
    let Some(current) = ctx.session.current_user() else {
        bail!("Not signed in. Run `fintrack login` first.");
    };

    let mut update = ProfileUpdate::from_profile(&current);
    if let Some(name) = name {
        update.name = name;
    }
    if let Some(email) = email {
        update.email = email;
    }
    if let Some(currency) = currency {
        update.currency = currency.to_ascii_uppercase();
    }

    let confirmed = ctx.api.update_profile(&update).await.map_err(report)?;
    ctx.session.update_user(confirmed);
    println!("Profile updated");
    Ok(())
}

pub async fn change_password(ctx: &Context) -> Result<()> {
    ctx.require_session()?;
    let change = PasswordChange {
        current_password: prompt_password("Current password")?,
        new_password: prompt_password("New password")?,
        confirm_password: prompt_password("Confirm new password")?,
    };

    ctx.api.change_password(&change).await.map_err(report)?;
    println!("Password changed");
    Ok(())
}

// ===== Dashboard =====

pub async fn dashboard(ctx: &Context) -> Result<()> {
    ctx.require_session()?;
    let summary = ctx.api.dashboard().await.map_err(report)?;
    let currency = ctx.currency();

    println!("Balance:  {}", format_amount(summary.balance, &currency));
    println!("Income:   {}", format_amount(summary.income, &currency));
    println!("Expenses: {}", format_amount(summary.expenses, &currency));
    if let Some(rate) = summary.savings_rate() {
        println!("Savings:  {:.1}%", rate);
    }

    if !summary.recent_transactions.is_empty() {
        println!("\nRecent");
        for t in &summary.recent_transactions {
            println!("{}", transaction_line(t, &currency));
        }
    }
    Ok(())
}

// ===== Transactions =====

fn transaction_line(t: &Transaction, currency: &str) -> String {
    format!(
        "{:<14} {:<28} {:<18} {:>12}  {}",
        format_date(&t.date),
        truncate_string(&t.description, 28),
        truncate_string(&t.category, 18),
        format_amount(t.signed_amount(), currency),
        t.id
    )
}

pub async fn list_transactions(
    ctx: &Context,
    kind: Option<TransactionKind>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    category: Option<String>,
) -> Result<()> {
    ctx.require_session()?;
    let filter = TransactionFilter {
        kind,
        start_date,
        end_date,
        category,
    };

    let transactions = ctx.api.list_transactions(&filter).await.map_err(report)?;
    // The backend may ignore some parameters
    let shown = filter.apply(&transactions);
    if shown.is_empty() {
        println!("No transactions");
        return Ok(());
    }

    let currency = ctx.currency();
    let total: f64 = shown.iter().map(|t| t.signed_amount()).sum();
    for t in &shown {
        println!("{}", transaction_line(t, &currency));
    }
    println!("\n{} transactions, net {}", shown.len(), format_amount(total, &currency));
    Ok(())
}

pub async fn add_transaction(
    ctx: &Context,
    kind: TransactionKind,
    amount: f64,
    description: String,
    category: String,
    date: Option<NaiveDate>,
) -> Result<()> {
    ctx.require_session()?;
    let draft = TransactionDraft {
        kind,
        amount,
        description,
        category,
        date: date.unwrap_or_else(|| Utc::now().date_naive()),
    };

    let created = ctx.api.create_transaction(&draft).await.map_err(report)?;
    println!("Added {}", transaction_line(&created, &ctx.currency()));
    Ok(())
}

pub async fn delete_transaction(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_session()?;
    ctx.api
        .delete_transaction(&EntityId::from(id))
        .await
        .map_err(report)?;
    println!("Deleted transaction {}", id);
    Ok(())
}

// ===== Budgets =====

fn budget_line(b: &Budget, currency: &str) -> String {
    let flag = if b.is_over_budget() { "  OVER" } else { "" };
    format!(
        "{:<20} {:<8} {:>12} of {:>12} ({:>5.1}%){}  {}",
        truncate_string(&b.category, 20),
        b.period.to_string(),
        format_amount(b.spent, currency),
        format_amount(b.amount, currency),
        b.percent_used(),
        flag,
        b.id
    )
}

pub async fn list_budgets(ctx: &Context) -> Result<()> {
    ctx.require_session()?;
    let budgets = ctx.api.list_budgets().await.map_err(report)?;
    if budgets.is_empty() {
        println!("No budgets");
        return Ok(());
    }

    let currency = ctx.currency();
    for b in &budgets {
        println!("{}", budget_line(b, &currency));
    }
    Ok(())
}

pub async fn add_budget(
    ctx: &Context,
    category: String,
    amount: f64,
    period: BudgetPeriod,
) -> Result<()> {
    ctx.require_session()?;
    let draft = BudgetDraft {
        category,
        amount,
        period,
    };

    let created = ctx.api.create_budget(&draft).await.map_err(report)?;
    println!("Added {}", budget_line(&created, &ctx.currency()));
    Ok(())
}

pub async fn delete_budget(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_session()?;
    ctx.api
        .delete_budget(&EntityId::from(id))
        .await
        .map_err(report)?;
    println!("Deleted budget {}", id);
    Ok(())
}
