use crate::core::{
    Asset, Milestone, SoADocument, WaterfallResult, format_capital, format_etr, format_liability,
    format_money, format_prescribed_part,
};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;width:100%;margin-bottom:1.5em}\
th,td{border:1px solid #999;padding:4px 8px}\
td.amount,th.amount{text-align:right}\
tr.total td{font-weight:bold;border-top:2px solid #333}";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

struct Table {
    html: String,
    amount_columns: usize,
}

impl Table {
    fn new(caption: &str, headers: &[&str], amount_columns: usize) -> Self {
        let mut html = format!("<table>\n<caption>{}</caption>\n<tr>", escape(caption));
        let text_columns = headers.len().saturating_sub(amount_columns);
        for (idx, header) in headers.iter().enumerate() {
            if idx >= text_columns {
                html.push_str(&format!("<th class=\"amount\">{}</th>", escape(header)));
            } else {
                html.push_str(&format!("<th>{}</th>", escape(header)));
            }
        }
        html.push_str("</tr>\n");
        Self {
            html,
            amount_columns,
        }
    }

    fn push(&mut self, class: Option<&str>, cells: &[String]) {
        match class {
            Some(class) => self.html.push_str(&format!("<tr class=\"{class}\">")),
            None => self.html.push_str("<tr>"),
        }
        let text_columns = cells.len().saturating_sub(self.amount_columns);
        for (idx, cell) in cells.iter().enumerate() {
            if idx >= text_columns {
                self.html
                    .push_str(&format!("<td class=\"amount\">{}</td>", escape(cell)));
            } else {
                self.html.push_str(&format!("<td>{}</td>", escape(cell)));
            }
        }
        self.html.push_str("</tr>\n");
    }

    fn row(&mut self, cells: &[String]) {
        self.push(None, cells);
    }

    fn total(&mut self, cells: &[String]) {
        self.push(Some("total"), cells);
    }

    fn finish(mut self) -> String {
        self.html.push_str("</table>\n");
        self.html
    }
}

/// Renders the statement as a standalone HTML page: Schedules A to D in order.
pub fn render_html(document: &SoADocument, result: &WaterfallResult) -> String {
    let as_at = document
        .as_at_date
        .map(|date| date.format("%d %B %Y").to_string())
        .unwrap_or_else(|| "not yet saved".to_string());

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Statement of Affairs {}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape(&document.case_id)
    ));
    html.push_str(&format!(
        "<h1>Statement of Affairs</h1>\n<p>Case {} &middot; version {} &middot; as at {}</p>\n",
        escape(&document.case_id),
        document.version,
        escape(&as_at)
    ));

    html.push_str(&schedule_a(document, result));
    html.push_str(&schedule_b(result));
    html.push_str(&schedule_c(document));
    html.push_str(&schedule_d(document, result));

    if !result.warnings.is_empty() {
        html.push_str("<h2>Notes</h2>\n<ul>\n");
        for warning in &result.warnings {
            html.push_str(&format!("<li>{}</li>\n", escape(&warning.to_string())));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn asset_rows(table: &mut Table, assets: &[Asset]) {
    for asset in assets {
        table.row(&[
            asset.description.clone(),
            asset.account_code.clone().unwrap_or_default(),
            format_money(asset.book_value),
            format_etr(asset.estimated_to_realise),
        ]);
    }
}

fn schedule_a(document: &SoADocument, result: &WaterfallResult) -> String {
    const HEADERS: [&str; 4] = ["Assets", "Account code", "Book value", "Estimated to realise"];
    let mut html = String::from("<h2>A &ndash; Summary of assets</h2>\n");

    let sections = document
        .schedule_a
        .charge_holder_sections
        .iter()
        .zip(&result.sections);
    for (idx, (section, totals)) in sections.enumerate() {
        let mut table = Table::new(
            &format!("Assets specifically pledged ({})", idx + 1),
            &HEADERS,
            2,
        );
        asset_rows(&mut table, &section.assets);
        table.total(&[
            "Total".to_string(),
            String::new(),
            format_money(totals.total_book),
            format_money(totals.total_etr),
        ]);
        for claim in &section.claims {
            table.row(&[
                format!("Less: amount due to {}", claim.name),
                String::new(),
                String::new(),
                format_liability(claim.magnitude()),
            ]);
        }
        table.total(&[
            "Surplus/(deficiency) carried to Schedule B".to_string(),
            String::new(),
            String::new(),
            format_money(section.fixed_charge_surplus),
        ]);
        html.push_str(&table.finish());
    }

    let global = &document.schedule_a.global_assets;
    for (caption, assets, pool) in [
        (
            "Assets subject to floating charge",
            &global.floating,
            &result.floating_pool,
        ),
        ("Uncharged assets", &global.uncharged, &result.uncharged_pool),
    ] {
        let mut table = Table::new(caption, &HEADERS, 2);
        asset_rows(&mut table, assets);
        table.total(&[
            "Total".to_string(),
            String::new(),
            format_money(pool.total_book),
            format_money(pool.total_etr),
        ]);
        html.push_str(&table.finish());
    }
    html
}

/// Liability lines with each running total emitted in rank order.
struct Waterfall {
    table: Table,
    totals: std::vec::IntoIter<Milestone>,
}

impl Waterfall {
    fn line(&mut self, label: impl Into<String>, value: String) {
        self.table.row(&[label.into(), value]);
    }

    fn milestone(&mut self) {
        if let Some(milestone) = self.totals.next() {
            self.table
                .total(&[milestone.label.to_string(), format_money(milestone.amount)]);
        }
    }
}

fn schedule_b(result: &WaterfallResult) -> String {
    let buckets = &result.buckets;
    let mut b = Waterfall {
        table: Table::new("Estimated deficiency/surplus", &["", "Estimated to realise"], 1),
        totals: result.milestones().into_iter(),
    };

    b.line(
        "Surplus carried from fixed charge sections",
        format_money(result.fixed_charge_surplus_total),
    );
    b.line(
        "Assets subject to floating charge",
        format_money(result.floating_pool.total_etr),
    );
    b.line("Uncharged assets", format_money(result.uncharged_pool.total_etr));
    b.milestone();

    b.line("Moratorium debts (post-moratorium)", format_liability(buckets.post_moratorium));
    b.line(
        "Priority pre-moratorium debts",
        format_liability(buckets.pre_moratorium),
    );
    b.milestone();

    b.line(
        "Preferential creditors (employees)",
        format_liability(buckets.employee_preferential),
    );
    b.milestone();

    b.line(
        "Secondary preferential creditors",
        format_liability(buckets.secondary_preferential),
    );
    b.milestone();

    b.line(
        "Estimated prescribed part of net property (to carry forward)",
        format_prescribed_part(result.prescribed_part),
    );
    b.milestone();

    b.line(
        "Debts secured by floating charges",
        format_liability(buckets.floating_charge_secured),
    );
    b.milestone();

    b.line(
        "Estimated prescribed part of net property (brought down)",
        format_prescribed_part(result.prescribed_part),
    );
    b.milestone();

    b.line("Employees", format_liability(buckets.unsecured_employees));
    b.line(
        "Trade and expense creditors",
        format_liability(buckets.trade_creditors),
    );
    b.line("Other unsecured creditors", format_liability(buckets.other_unsecured));
    for claim in &buckets.recharacterised {
        b.line(claim.label(), format_liability(claim.amount));
    }
    b.milestone();
    b.milestone();

    b.line(
        "Issued and called up capital",
        format_capital(result.called_up_capital),
    );
    b.milestone();

    format!(
        "<h2>B &ndash; Liabilities</h2>\n{}",
        b.table.finish()
    )
}

fn schedule_c(document: &SoADocument) -> String {
    let schedule = &document.schedule_c;
    let mut html = String::from("<h2>C &ndash; Creditors</h2>\n");

    let mut company = Table::new(
        "Company creditors",
        &[
            "Name",
            "Address",
            "Amount",
            "Retention of title",
            "Details of security",
            "Date security given",
            "Value of security",
        ],
        1,
    );
    for creditor in &schedule.company_creditors {
        company.row(&[
            creditor.name.clone(),
            creditor.address.clone(),
            format_liability(creditor.balance_owed),
            if creditor.retention_of_title { "Yes" } else { "No" }.to_string(),
            creditor.security_type.clone(),
            creditor
                .security_date
                .map(|date| date.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            format_liability(creditor.security_value),
        ]);
    }
    html.push_str(&company.finish());

    let mut consumer = Table::new("Consumer creditors", &["Name", "Address", "Amount"], 1);
    for creditor in &schedule.consumer_creditors {
        consumer.row(&[
            creditor.name.clone(),
            creditor.address.clone(),
            format_liability(creditor.balance_owed),
        ]);
    }
    html.push_str(&consumer.finish());

    let mut employees = Table::new(
        "Employee creditors",
        &["Name", "Address", "Preferential claim", "Unsecured claim"],
        2,
    );
    for employee in &schedule.employee_creditors {
        employees.row(&[
            employee.name.clone(),
            employee.address.clone(),
            format_liability(employee.total_preferential_claim),
            format_liability(employee.total_unsecured_claim),
        ]);
    }
    html.push_str(&employees.finish());
    html
}

fn schedule_d(document: &SoADocument, result: &WaterfallResult) -> String {
    let mut members = Table::new(
        "Company shareholders",
        &[
            "Name",
            "Address",
            "Share class",
            "Shares held",
            "Nominal value",
            "Amount paid",
            "Amount unpaid",
        ],
        4,
    );
    for shareholder in &document.schedule_d.shareholders {
        members.row(&[
            shareholder.name.clone(),
            shareholder.address.clone(),
            shareholder.share_class.clone(),
            shareholder.shares_held.to_string(),
            format_money(shareholder.nominal_value_per_share),
            format_money(shareholder.amount_paid),
            format_money(shareholder.amount_unpaid),
        ]);
    }
    members.total(&[
        "Issued and called up capital".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format_capital(result.called_up_capital),
    ]);
    format!("<h2>D &ndash; Members</h2>\n{}", members.finish())
}
