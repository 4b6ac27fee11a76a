use std::collections::BTreeSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use aquabill_core::config::AppConfig;
use aquabill_core::report::{BillDetail, Statement};

use crate::error::InvoiceError;
use crate::views::{display_date, money, BillView, CustomerView, LineView, PeriodView};

const BILL_TEMPLATE: &str = "bill.html.tera";
const STATEMENT_TEMPLATE: &str = "statement.html.tera";

const EMBEDDED_TEMPLATES: [(&str, &str); 2] = [
    (BILL_TEMPLATE, include_str!("../../../templates/invoices/bill.html.tera")),
    (STATEMENT_TEMPLATE, include_str!("../../../templates/invoices/statement.html.tera")),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceSettings {
    pub issuer_name: String,
    pub currency_symbol: String,
    /// Shown on statements that have no lines to take a rate from.
    pub rate_per_hour: Decimal,
}

impl InvoiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            issuer_name: config.invoice.issuer_name.clone(),
            currency_symbol: config.billing.currency_symbol.clone(),
            rate_per_hour: config.billing.rate_per_hour,
        }
    }
}

/// A rendered, printable HTML document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub html: String,
}

#[derive(Clone, Debug)]
pub struct InvoiceFormatter {
    tera: Tera,
    settings: InvoiceSettings,
}

impl InvoiceFormatter {
    pub fn with_embedded_templates(settings: InvoiceSettings) -> Result<Self, InvoiceError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(EMBEDDED_TEMPLATES)?;
        Ok(Self::finish(tera, settings))
    }

    /// Loads `*.html.tera` files from `template_dir`. Templates missing from
    /// the directory fall back to the embedded ones.
    pub fn with_template_dir(
        template_dir: &Path,
        settings: InvoiceSettings,
    ) -> Result<Self, InvoiceError> {
        let pattern = format!("{}/**/*.html.tera", template_dir.display());
        let mut tera = Tera::new(&pattern)?;

        let mut embedded = Tera::default();
        embedded.add_raw_templates(EMBEDDED_TEMPLATES)?;
        tera.extend(&embedded)?;

        Ok(Self::finish(tera, settings))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, InvoiceError> {
        let settings = InvoiceSettings::from_config(config);
        match &config.invoice.template_dir {
            Some(dir) => Self::with_template_dir(dir, settings),
            None => Self::with_embedded_templates(settings),
        }
    }

    fn finish(mut tera: Tera, settings: InvoiceSettings) -> Self {
        tera.autoescape_on(vec![".html.tera", ".html"]);
        tera.set_escape_fn(escape_html);
        Self { tera, settings }
    }

    pub fn settings(&self) -> &InvoiceSettings {
        &self.settings
    }

    pub fn render(&self, detail: &BillDetail) -> Result<Document, InvoiceError> {
        let symbol = &self.settings.currency_symbol;
        let title = "Water Supply Bill".to_string();

        let mut context = Context::new();
        context.insert("title", &title);
        context.insert("issuer_name", &self.settings.issuer_name);
        context.insert("customer", &CustomerView::new(&detail.customer));
        context.insert("bill", &BillView::new(&detail.bill, symbol));
        context.insert("line", &LineView::new(&detail.record, &detail.bill, symbol));

        let html = self.tera.render(BILL_TEMPLATE, &context)?;
        info!(
            event_name = "invoice.rendered",
            template = BILL_TEMPLATE,
            bill_id = %detail.bill.id,
            "bill rendered"
        );
        Ok(Document { title, html })
    }

    pub fn render_statement(&self, statement: &Statement) -> Result<Document, InvoiceError> {
        let symbol = &self.settings.currency_symbol;
        let title = "Water Supply Invoice".to_string();
        let lines: Vec<LineView> = statement
            .lines
            .iter()
            .map(|line| LineView::new(&line.record, &line.bill, symbol))
            .collect();

        let mut context = Context::new();
        context.insert("title", &title);
        context.insert("issuer_name", &self.settings.issuer_name);
        context.insert("customer", &CustomerView::new(&statement.customer));
        context.insert(
            "period",
            &PeriodView {
                from: display_date(statement.period.from),
                to: display_date(statement.period.to),
            },
        );
        context.insert("rate", &self.rate_label(statement));
        context.insert("lines", &lines);
        context.insert("total", &money(symbol, statement.total));
        context.insert("outstanding", &money(symbol, statement.outstanding));

        let html = self.tera.render(STATEMENT_TEMPLATE, &context)?;
        info!(
            event_name = "invoice.rendered",
            template = STATEMENT_TEMPLATE,
            customer_id = %statement.customer.id,
            lines = lines.len(),
            "statement rendered"
        );
        Ok(Document { title, html })
    }

    /// Distinct rates billed over the statement, lowest first.
    fn rate_label(&self, statement: &Statement) -> String {
        let symbol = &self.settings.currency_symbol;
        let rates: BTreeSet<Decimal> =
            statement.lines.iter().map(|line| line.bill.rate().normalize()).collect();
        if rates.is_empty() {
            return money(symbol, self.settings.rate_per_hour);
        }
        rates.into_iter().map(|rate| money(symbol, rate)).collect::<Vec<_>>().join(", ")
    }
}

/// Escapes markup characters but keeps `/`, which appears in every displayed date.
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
