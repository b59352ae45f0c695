//! Email bodies for a finished analysis

use crate::types::AnalysisResult;

const SUBJECT_QUERY_CHARS: usize = 60;

pub fn subject(query: &str) -> String {
    let query = query.trim();
    let short: String = query.chars().take(SUBJECT_QUERY_CHARS).collect();
    if short.len() < query.len() {
        format!("Your narrative analysis: \"{}...\"", short)
    } else {
        format!("Your narrative analysis: \"{}\"", short)
    }
}

pub fn text_body(query: &str, result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Query: {}\n\n", query.trim()));

    out.push_str("SUMMARY\n");
    out.push_str(&result.overall_summary);
    out.push_str("\n\n");

    if !result.key_themes.is_empty() {
        out.push_str("KEY THEMES\n");
        for theme in &result.key_themes {
            out.push_str(&format!("- {}\n", theme));
        }
        out.push('\n');
    }

    if !result.emerging_trends.is_empty() {
        out.push_str("EMERGING TRENDS\n");
        for trend in &result.emerging_trends {
            out.push_str(&format!("- {}: {}\n", trend.trend, trend.description));
            for data in &trend.supporting_data {
                out.push_str(&format!("    * {}\n", data));
            }
        }
        out.push('\n');
    }

    if !result.notable_quotes.is_empty() {
        out.push_str("NOTABLE QUOTES\n");
        for quote in &result.notable_quotes {
            out.push_str(&format!("\"{}\"\n  {}\n", quote.quote, quote.context));
        }
        out.push('\n');
    }

    if !result.data_connections.is_empty() {
        out.push_str("DATA CONNECTIONS\n");
        out.push_str(&result.data_connections);
        out.push('\n');
    }

    out
}

pub fn html_body(query: &str, result: &AnalysisResult) -> String {
    let mut html = String::from("<html><body>\n");
    html.push_str(&format!(
        "<h1>Narrative analysis</h1>\n<p><strong>Query:</strong> {}</p>\n",
        escape_html(query.trim())
    ));

    html.push_str(&format!(
        "<h2>Summary</h2>\n<p>{}</p>\n",
        escape_html(&result.overall_summary)
    ));

    if !result.key_themes.is_empty() {
        html.push_str("<h2>Key Themes</h2>\n<ul>\n");
        for theme in &result.key_themes {
            html.push_str(&format!("<li>{}</li>\n", escape_html(theme)));
        }
        html.push_str("</ul>\n");
    }

    if !result.emerging_trends.is_empty() {
        html.push_str("<h2>Emerging Trends</h2>\n");
        for trend in &result.emerging_trends {
            html.push_str(&format!(
                "<h3>{}</h3>\n<p>{}</p>\n",
                escape_html(&trend.trend),
                escape_html(&trend.description)
            ));
            if !trend.supporting_data.is_empty() {
                html.push_str("<ul>\n");
                for data in &trend.supporting_data {
                    html.push_str(&format!("<li>{}</li>\n", escape_html(data)));
                }
                html.push_str("</ul>\n");
            }
        }
    }

    if !result.notable_quotes.is_empty() {
        html.push_str("<h2>Notable Quotes</h2>\n");
        for quote in &result.notable_quotes {
            html.push_str(&format!(
                "<blockquote>{}<br><small>{}</small></blockquote>\n",
                escape_html(&quote.quote),
                escape_html(&quote.context)
            ));
        }
    }

    if !result.data_connections.is_empty() {
        html.push_str(&format!(
            "<h2>Data Connections</h2>\n<p>{}</p>\n",
            escape_html(&result.data_connections)
        ));
    }

    html.push_str("</body></html>\n");
    html
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NotableQuote, Trend};

    fn sample() -> AnalysisResult {
        AnalysisResult {
            overall_summary: "Coverage shifted toward <trade> & tariffs".to_string(),
            key_themes: vec!["tariffs".to_string()],
            emerging_trends: vec![Trend {
                trend: "Reshoring".to_string(),
                description: "More factories".to_string(),
                supporting_data: vec!["row 12".to_string()],
            }],
            notable_quotes: vec![NotableQuote {
                quote: "It's \"complicated\"".to_string(),
                context: "Op-ed".to_string(),
            }],
            data_connections: String::new(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_subject_truncates_long_queries() {
        assert_eq!(subject(" tariffs "), "Your narrative analysis: \"tariffs\"");
        let long = "q".repeat(100);
        let s = subject(&long);
        assert!(s.ends_with("...\""));
        assert!(s.contains(&"q".repeat(60)));
        assert!(!s.contains(&"q".repeat(61)));
    }

    #[test]
    fn test_html_body_escapes_model_text() {
        let html = html_body("<script>alert(1)</script>", &sample());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;trade&gt; &amp; tariffs"));
        assert!(html.contains("It&#39;s &quot;complicated&quot;"));
        assert!(html.contains("<h2>Key Themes</h2>"));
        assert!(!html.contains("Data Connections"));
    }

    #[test]
    fn test_text_body_sections() {
        let text = text_body("tariffs", &sample());
        assert!(text.starts_with("Query: tariffs"));
        assert!(text.contains("KEY THEMES\n- tariffs"));
        assert!(text.contains("- Reshoring: More factories"));
        assert!(text.contains("    * row 12"));
        assert!(!text.contains("DATA CONNECTIONS"));
    }
}
