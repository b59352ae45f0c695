use console::style;

use crate::storage::{User, UserAnalysis};
use crate::types::AnalysisResult;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn analysis(&self, query: &str, result: &AnalysisResult) {
        self.header(&format!("Analysis: {}", query));
        print!("{}", render_result(result));
    }

    pub fn user(&self, user: &User) {
        println!("{} {}", style("User").bold(), user.id);
        println!("  Email:      {}", user.email);
        println!(
            "  Plan:       {}",
            if user.is_subscriber {
                "subscriber (unlimited)"
            } else {
                "free"
            }
        );
        println!("  Created:    {}", user.created_at.format("%Y-%m-%d %H:%M UTC"));
        match user.last_query_date {
            Some(date) => println!("  Queries:    {} on {}", user.query_count, date),
            None => println!("  Queries:    none yet"),
        }
    }

    pub fn history(&self, analyses: &[UserAnalysis]) {
        if analyses.is_empty() {
            self.info("No saved analyses");
            return;
        }
        for analysis in analyses {
            println!(
                "{}  {}  {}",
                style(analysis.created_at.format("%Y-%m-%d %H:%M")).dim(),
                style(&analysis.id).cyan(),
                analysis.query
            );
            let summary: String = analysis.result.overall_summary.chars().take(100).collect();
            if !summary.is_empty() {
                println!("    {}", summary);
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

/// Titled sections, one per result field; empty sections are skipped.
pub fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::new();

    push_section(&mut out, "Summary");
    out.push_str(&result.overall_summary);
    out.push('\n');

    if !result.key_themes.is_empty() {
        push_section(&mut out, "Key Themes");
        for (i, theme) in result.key_themes.iter().enumerate() {
            out.push_str(&format!("{:>2}. {}\n", i + 1, theme));
        }
    }

    if !result.emerging_trends.is_empty() {
        push_section(&mut out, "Emerging Trends");
        for trend in &result.emerging_trends {
            out.push_str(&format!("• {}\n", style(&trend.trend).bold()));
            if !trend.description.is_empty() {
                out.push_str(&format!("  {}\n", trend.description));
            }
            for data in &trend.supporting_data {
                out.push_str(&format!("    - {}\n", style(data).dim()));
            }
        }
    }

    if !result.notable_quotes.is_empty() {
        push_section(&mut out, "Notable Quotes");
        for quote in &result.notable_quotes {
            out.push_str(&format!("“{}”\n", style(&quote.quote).italic()));
            if !quote.context.is_empty() {
                out.push_str(&format!("  {}\n", style(&quote.context).dim()));
            }
        }
    }

    if !result.data_connections.is_empty() {
        push_section(&mut out, "Data Connections");
        out.push_str(&result.data_connections);
        out.push('\n');
    }

    out
}

fn push_section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n{}\n", style(title).bold(), "─".repeat(40)));
}
