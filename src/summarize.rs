use anyhow::anyhow;
use chrono::Months;
use clap::Args;
use colored::Colorize;
use std::{collections::BTreeMap, collections::HashMap, io::Write};
use tracing::{debug, warn};

use crate::{
    config::{Configuration, Workspace},
    engine::ValidationError,
    ledger::{write_transactions, Ledger},
    model::*,
    parsing::parse_month,
};

#[derive(Debug, Args)]
pub struct Command {
    /// Name of the user directory.
    #[arg(long)]
    pub user: String,
    /// Month to summarize.
    #[arg(long, value_name = "YYYYMM")]
    pub month: String,
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct CashFlowSummary {
    pub revenue: BigDecimal,
    pub fixed_expenses: BigDecimal,
    pub variable_expenses: BigDecimal,
    pub profit_margin: BigDecimal,
    pub misc_income: BigDecimal,
    pub misc_expenses: BigDecimal,
    pub net_income: BigDecimal,
}

impl CashFlowSummary {
    fn accumulate(&mut self, category: &str, total: &BigDecimal) {
        match category {
            "Revenue" => self.revenue += total,
            "Fixed" => self.fixed_expenses -= total.abs(),
            "Variable" => self.variable_expenses -= total.abs(),
            "Misc Income" => self.misc_income += total.abs(),
            "Misc Expense" => self.misc_expenses -= total.abs(),
            _ => {}
        }
    }

    fn close(mut self) -> Self {
        self.profit_margin = &self.revenue + &self.fixed_expenses + &self.variable_expenses;
        self.net_income = &self.profit_margin + &self.misc_income + &self.misc_expenses;
        self
    }

    fn lines(&self) -> [(&'static str, &BigDecimal); 7] {
        [
            ("Revenue", &self.revenue),
            ("Fixed Expenses", &self.fixed_expenses),
            ("Variable Expenses", &self.variable_expenses),
            ("Profit Margin", &self.profit_margin),
            ("Misc Income", &self.misc_income),
            ("Misc Expenses", &self.misc_expenses),
            ("Net Income", &self.net_income),
        ]
    }
}

#[derive(Debug, PartialEq)]
pub struct CategoryTotals {
    pub name: String,
    /// Sorted by description.
    pub totals: Vec<(String, BigDecimal)>,
}

#[derive(Debug, PartialEq)]
pub struct ProfitAndLoss {
    pub categories: Vec<CategoryTotals>,
    pub summary: CashFlowSummary,
}

#[cfg(test)]
impl ProfitAndLoss {
    pub fn get(&self, category: &str, description: &str) -> Option<&BigDecimal> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .and_then(|c| c.totals.iter().find(|(d, _)| d == description))
            .map(|(_, total)| total)
    }
}

pub fn find_uncategorized<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    config: &Configuration,
) -> Vec<&'a Transaction> {
    transactions
        .filter(|tx| !config.is_category(&tx.category))
        .collect()
}

/// Totals the given month per category and description.
pub fn calculate_pnl<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    month: NaiveDate,
    categories: &[String],
) -> Result<ProfitAndLoss> {
    let end = month
        .checked_add_months(Months::new(1))
        .ok_or_else(|| anyhow!("Month out of range: {}", month))?;

    let mut grouped: HashMap<&str, BTreeMap<&str, BigDecimal>> = HashMap::new();

    for tx in transactions
        .filter(|tx| tx.date >= month && tx.date < end)
        .filter(|tx| categories.contains(&tx.category))
    {
        *grouped
            .entry(tx.category.as_str())
            .or_default()
            .entry(tx.description.as_str())
            .or_default() += &tx.amount;
    }

    let mut summary = CashFlowSummary::default();

    let categories = categories
        .iter()
        .unique()
        .map(|name| {
            let totals = grouped
                .remove(name.as_str())
                .unwrap_or_default()
                .into_iter()
                .map(|(description, total)| {
                    summary.accumulate(name, &total);
                    (description.to_owned(), total)
                })
                .collect_vec();

            debug!("{} {:?}", name, totals);

            CategoryTotals {
                name: name.clone(),
                totals,
            }
        })
        .collect_vec();

    Ok(ProfitAndLoss {
        categories,
        summary: summary.close(),
    })
}

pub fn format_pnl(pnl: &ProfitAndLoss) -> String {
    let mut output = vec!["CASH FLOW SUMMARY".to_owned(), "=".repeat(40)];

    for category in pnl.categories.iter().filter(|c| !c.totals.is_empty()) {
        output.push(format!("\n{}:", category.name));
        for (description, total) in category.totals.iter() {
            output.push(format!("  {}: {}", description, format_amount(total)));
        }
    }

    output.push("\nCASH FLOW STATEMENT:".to_owned());
    for (label, value) in pnl.summary.lines() {
        output.push(format!("  {}: {}", label, format_amount(value)));
    }

    output.join("\n")
}

pub fn execute_command(workspace: &Workspace, cmd: &Command) -> anyhow::Result<()> {
    let month =
        parse_month(&cmd.month).ok_or_else(|| ValidationError::MalformedMonth(cmd.month.clone()))?;

    let user = workspace.user(&cmd.user);
    let config = user.load_config()?;
    let ledger = Ledger::load(&user)?;
    if ledger.is_empty() {
        warn!("no transactions in {:?}", user.ledger_path());
    }

    let pnl = calculate_pnl(ledger.iter(), month, &config.categories)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", format_pnl(&pnl))?;

    let uncategorized = find_uncategorized(ledger.iter(), &config);
    if !uncategorized.is_empty() {
        writeln!(
            out,
            "\n{}",
            "WARNING: Uncategorized transactions found:".yellow()
        )?;
        for tx in uncategorized.iter() {
            writeln!(
                out,
                "  {} | {} | Category: '{}'",
                tx.date, tx.description, tx.category
            )?;
        }

        let path = user.output_path("uncategorized", workspace.today);
        write_transactions(std::fs::File::create(&path)?, uncategorized.into_iter())?;
        writeln!(
            out,
            "\nUncategorized transactions saved to: {}",
            path.display()
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, str::FromStr};

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("inline decimal error")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
    }

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new(date(2023, 12, 5), decimal("2000.00"), "Paycheck", "Revenue", false),
            Transaction::new(date(2023, 12, 15), decimal("-1200.00"), "Rent", "Fixed", false),
            Transaction::new(date(2023, 12, 20), decimal("-50.00"), "Gas", "Variable", false),
            Transaction::new(date(2023, 12, 25), decimal("-75.50"), "Groceries", "Varaible", false),
            Transaction::new(date(2024, 1, 1), decimal("-1200.00"), "Rent", "Fixed", true),
        ]
    }

    fn valid_categories() -> Vec<String> {
        ["Revenue", "Fixed", "Variable", "Misc Income", "Misc Expense", "Investment"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_find_uncategorized() {
        let txs = sample_transactions();
        let config = Configuration {
            categories: valid_categories(),
            ..Default::default()
        };

        let uncategorized = find_uncategorized(txs.iter(), &config);

        assert_eq!(uncategorized.len(), 1);
        assert_eq!(uncategorized[0].description, "Groceries");
        assert_eq!(uncategorized[0].category, "Varaible");
    }

    #[test]
    fn test_calculate_pnl() -> Result<()> {
        let txs = sample_transactions();
        let pnl = calculate_pnl(txs.iter(), date(2023, 12, 1), &valid_categories())?;

        assert_eq!(pnl.get("Revenue", "Paycheck"), Some(&decimal("2000")));
        assert_eq!(pnl.get("Fixed", "Rent"), Some(&decimal("-1200")));
        assert_eq!(pnl.get("Variable", "Gas"), Some(&decimal("-50")));
        assert_eq!(pnl.get("Variable", "Groceries"), None);

        let fixed = pnl
            .categories
            .iter()
            .find(|c| c.name == "Fixed")
            .expect("missing category");
        assert_eq!(fixed.totals.len(), 1);

        assert_eq!(pnl.summary.revenue, decimal("2000"));
        assert_eq!(pnl.summary.fixed_expenses, decimal("-1200"));
        assert_eq!(pnl.summary.variable_expenses, decimal("-50"));
        assert_eq!(pnl.summary.profit_margin, decimal("750"));
        assert_eq!(pnl.summary.net_income, decimal("750"));

        Ok(())
    }

    #[test]
    fn test_calculate_pnl_groups_descriptions() -> Result<()> {
        let txs = vec![
            Transaction::new(date(2024, 2, 3), decimal("-40"), "Gas", "Variable", false),
            Transaction::new(date(2024, 2, 1), decimal("-12.25"), "Coffee", "Variable", false),
            Transaction::new(date(2024, 2, 17), decimal("-35.10"), "Gas", "Variable", false),
            Transaction::new(date(2024, 2, 29), decimal("-100"), "Refund", "Misc Income", false),
            Transaction::new(date(2024, 2, 9), decimal("20"), "Fee", "Misc Expense", false),
        ];

        let pnl = calculate_pnl(txs.iter(), date(2024, 2, 1), &valid_categories())?;

        let variable = pnl
            .categories
            .iter()
            .find(|c| c.name == "Variable")
            .expect("missing category");
        assert_eq!(
            variable.totals,
            vec![
                ("Coffee".to_owned(), decimal("-12.25")),
                ("Gas".to_owned(), decimal("-75.10")),
            ]
        );

        assert_eq!(pnl.summary.variable_expenses, decimal("-87.35"));
        assert_eq!(pnl.summary.misc_income, decimal("100"));
        assert_eq!(pnl.summary.misc_expenses, decimal("-20"));
        assert_eq!(pnl.summary.profit_margin, decimal("-87.35"));
        assert_eq!(pnl.summary.net_income, decimal("-7.35"));

        Ok(())
    }

    #[test]
    fn test_calculate_pnl_no_transactions() -> Result<()> {
        let pnl = calculate_pnl(std::iter::empty(), date(2023, 12, 1), &valid_categories())?;

        assert_eq!(pnl.summary, CashFlowSummary::default());
        assert!(pnl.categories.iter().all(|c| c.totals.is_empty()));

        Ok(())
    }

    #[test]
    fn test_format_pnl() -> Result<()> {
        let txs = sample_transactions();
        let pnl = calculate_pnl(txs.iter(), date(2023, 12, 1), &valid_categories())?;

        let text = format_pnl(&pnl);

        assert!(text.starts_with("CASH FLOW SUMMARY\n========================================\n"));
        assert!(text.contains("\nRevenue:\n  Paycheck: 2000.00"));
        assert!(text.contains("\nFixed:\n  Rent: -1200.00"));
        assert!(!text.contains("Investment:"));
        assert!(text.contains("CASH FLOW STATEMENT:"));
        assert!(text.contains("  Revenue: 2000.00"));
        assert!(text.contains("  Fixed Expenses: -1200.00"));
        assert!(text.contains("  Variable Expenses: -50.00"));
        assert!(text.contains("  Profit Margin: 750.00"));
        assert!(text.contains("  Misc Income: 0.00"));
        assert!(text.contains("  Net Income: 750.00"));

        Ok(())
    }

    #[test]
    fn test_execute_command_writes_uncategorized() -> Result<()> {
        let base = tempfile::tempdir()?;
        let workspace = Workspace::new(base.path(), date(2024, 1, 2));
        let user = workspace.user("integration_user");
        fs::create_dir_all(user.path())?;
        fs::write(
            user.config_path(),
            "categories: [Revenue, Fixed, Variable]\n",
        )?;
        fs::write(
            user.ledger_path(),
            r"date,amount,description,category,forecast
2023-12-05,2000.00,Paycheck,Revenue,0
2023-12-15,-1200.00,Rent,Fixed,0
2023-12-20,-50.00,Gas,Variable,0
2023-12-25,-75.50,Groceries,Varaible,0
",
        )?;

        execute_command(
            &workspace,
            &Command {
                user: "integration_user".into(),
                month: "202312".into(),
            },
        )?;

        let written = fs::read_to_string(user.path().join("uncategorized_20240102.csv"))?;
        assert_eq!(
            written,
            "date,amount,description,category,forecast\n2023-12-25,-75.50,Groceries,Varaible,0\n"
        );

        Ok(())
    }

    #[test]
    fn test_execute_command_rejects_bad_month() {
        let workspace = Workspace::new("./users", date(2024, 1, 2));
        let err = execute_command(
            &workspace,
            &Command {
                user: "chad".into(),
                month: "2023-12".into(),
            },
        )
        .expect_err("expected malformed month");

        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MalformedMonth("2023-12".into()))
        );
    }
}
