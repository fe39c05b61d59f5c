//! Plain-text rendering of a token data bundle.
//!
//! Presentation only: nothing here influences fetching or merging.

use std::fmt::Write;

use crate::models::{AggregateStatus, TokenData};

/// Render `data` as a compact block suitable for a prompt or a terminal.
pub fn format_market_context(data: &TokenData) -> String {
    let market = &data.market;
    let on_chain = &data.on_chain;
    let technical = &data.technical;
    let social = &data.social;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} market context ({})",
        data.symbol,
        data.timestamp.format("%Y-%m-%d %H:%M UTC")
    );

    let _ = writeln!(out, "Market:");
    let _ = writeln!(
        out,
        "  Price: {} ({:+.2}% 24h)",
        format_price(market.price),
        market.price_change_24h
    );
    let _ = writeln!(out, "  Market cap: {}", format_usd(market.market_cap));
    let _ = writeln!(out, "  Volume 24h: {}", format_usd(market.volume_24h));
    if market.high_24h > 0.0 || market.low_24h > 0.0 {
        let _ = writeln!(
            out,
            "  Range 24h: {} - {}",
            format_price(market.low_24h),
            format_price(market.high_24h)
        );
    }
    if market.liquidity > 0.0 {
        let _ = writeln!(out, "  Liquidity: {}", format_usd(market.liquidity));
    }

    let _ = writeln!(out, "On-chain:");
    let _ = writeln!(out, "  Holders: {}", format_count(on_chain.holders));
    let _ = writeln!(
        out,
        "  Transactions 24h: {}",
        format_count(on_chain.transactions_24h)
    );
    if !on_chain.chain.is_empty() {
        let _ = writeln!(out, "  Chain: {}", on_chain.chain);
    }

    let _ = writeln!(out, "Technical:");
    let _ = writeln!(out, "  RSI: {:.1}", technical.rsi);
    let _ = writeln!(
        out,
        "  MACD: {:.4} (signal {:.4})",
        technical.macd, technical.macd_signal
    );
    let _ = writeln!(
        out,
        "  Bollinger: {} / {} / {}",
        format_price(technical.bollinger_lower),
        format_price(technical.bollinger_middle),
        format_price(technical.bollinger_upper)
    );

    let _ = writeln!(out, "Social:");
    let _ = writeln!(
        out,
        "  Twitter followers: {}",
        format_count(social.twitter_followers)
    );
    let _ = writeln!(out, "  Mentions 24h: {}", format_count(social.mentions_24h));
    let _ = writeln!(out, "  Sentiment: {:.0}/100", social.sentiment_score);

    match data.status {
        AggregateStatus::Success => {}
        AggregateStatus::Partial => {
            let _ = writeln!(out, "Note: some sources were unavailable.");
        }
        AggregateStatus::Error => {
            let _ = writeln!(out, "Note: no source returned data.");
        }
    }

    out
}

/// `$1.23B`-style dollar amount.
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let (scaled, suffix) = if abs >= 1e12 {
        (abs / 1e12, "T")
    } else if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        return format!("{}${:.2}", sign, abs);
    };
    format!("{}${:.2}{}", sign, scaled, suffix)
}

/// Unit price with enough precision for sub-cent tokens.
fn format_price(value: f64) -> String {
    if value != 0.0 && value.abs() < 0.01 {
        format!("${:.8}", value)
    } else {
        format!("${:.2}", value)
    }
}

fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketData, OnChainMetrics, SocialMetrics, TechnicalIndicators};
    use chrono::{TimeZone, Utc};

    fn token_data(status: AggregateStatus) -> TokenData {
        TokenData {
            symbol: "BTC".to_string(),
            market: MarketData {
                price: 50_000.0,
                market_cap: 980_000_000_000.0,
                volume_24h: 25_000_000_000.0,
                price_change_24h: 2.5,
                ..Default::default()
            },
            on_chain: OnChainMetrics {
                holders: 1_234_567,
                ..Default::default()
            },
            technical: TechnicalIndicators {
                rsi: 61.23,
                ..Default::default()
            },
            social: SocialMetrics::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            status,
            errors: None,
        }
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(999.5), "$999.50");
        assert_eq!(format_usd(1_500.0), "$1.50K");
        assert_eq!(format_usd(25_000_000_000.0), "$25.00B");
        assert_eq!(format_usd(2.1e12), "$2.10T");
        assert_eq!(format_usd(-3_000_000.0), "-$3.00M");
    }

    #[test]
    fn test_format_price_and_count() {
        assert_eq!(format_price(0.0000231), "$0.00002310");
        assert_eq!(format_price(50_000.0), "$50000.00");
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn test_market_context_contents() {
        let text = format_market_context(&token_data(AggregateStatus::Success));
        assert!(text.starts_with("BTC market context (2024-03-01 12:30 UTC)"));
        assert!(text.contains("Price: $50000.00 (+2.50% 24h)"));
        assert!(text.contains("Market cap: $980.00B"));
        assert!(text.contains("Holders: 1,234,567"));
        assert!(text.contains("RSI: 61.2"));
        assert!(!text.contains("Range 24h"));
        assert!(!text.contains("Note:"));
    }

    #[test]
    fn test_market_context_flags_degraded_status() {
        let partial = format_market_context(&token_data(AggregateStatus::Partial));
        assert!(partial.contains("Note: some sources were unavailable."));

        let error = format_market_context(&TokenData {
            market: MarketData::default(),
            ..token_data(AggregateStatus::Error)
        });
        assert!(error.contains("Price: $0.00 (+0.00% 24h)"));
        assert!(error.contains("Note: no source returned data."));
    }
}
