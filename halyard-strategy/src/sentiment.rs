use crate::context::SentimentReading;
use halyard_instrument::SignalType;
use rust_decimal::Decimal;

/// Outcome of the sentiment gate (SPEC_FULL.md §4.4 item 5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SentimentDecision {
    /// Proceed with the (possibly already-adjusted) ratio unchanged.
    Execute,
    /// Halve the current ratio; baseline is the already-adjusted ratio, so repeated reductions
    /// compound rather than reset from the unadjusted base.
    Reduce,
    /// Proceed, but the caller should surface a warning alongside the signal.
    Warn(&'static str),
    /// Do not act on this signal at all.
    Skip(&'static str),
}

const EXTREME_GREED: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const EXTREME_FEAR: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
const SKIP_KEYWORD_SCORE: Decimal = Decimal::from_parts(4, 0, 0, true, 0);
const IMPORTANT_NEWS_THRESHOLD: u32 = 5;

/// Evaluates sentiment for a candidate signal. Opens are gated on greed/keyword extremes; sells
/// during extreme fear or a rapid F&G rise still execute but carry a warning.
pub fn evaluate(signal_type: SignalType, sentiment: Option<&SentimentReading>) -> SentimentDecision {
    let Some(s) = sentiment else {
        return SentimentDecision::Execute;
    };

    if signal_type.opens_position() {
        if s.fear_greed_index > EXTREME_GREED {
            return SentimentDecision::Skip("extreme_greed");
        }
        if s.keyword_score <= SKIP_KEYWORD_SCORE {
            return SentimentDecision::Skip("negative_keyword_score");
        }
        if s.fear_greed_delta < Decimal::ZERO {
            return SentimentDecision::Skip("fear_greed_alert_dropping");
        }
        if s.fear_greed_index < Decimal::new(45, 0) || s.important_news_count >= IMPORTANT_NEWS_THRESHOLD {
            return SentimentDecision::Reduce;
        }
        return SentimentDecision::Execute;
    }

    if signal_type.closes_position() {
        if s.fear_greed_index < EXTREME_FEAR {
            return SentimentDecision::Warn("extreme_fear");
        }
        if s.fear_greed_delta > Decimal::new(20, 0) {
            return SentimentDecision::Warn("fear_greed_rapid_rise");
        }
    }

    SentimentDecision::Execute
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reading(fgi: Decimal, delta: Decimal, keyword: Decimal, news: u32) -> SentimentReading {
        SentimentReading { fear_greed_index: fgi, fear_greed_delta: delta, keyword_score: keyword, important_news_count: news }
    }

    #[test]
    fn skips_buy_on_extreme_greed() {
        let s = reading(dec!(85), dec!(0), dec!(0), 0);
        assert_eq!(evaluate(SignalType::Buy, Some(&s)), SentimentDecision::Skip("extreme_greed"));
    }

    #[test]
    fn reduces_on_bearish_sentiment() {
        let s = reading(dec!(40), dec!(1), dec!(0), 0);
        assert_eq!(evaluate(SignalType::Buy, Some(&s)), SentimentDecision::Reduce);
    }

    #[test]
    fn warns_on_sell_during_extreme_fear() {
        let s = reading(dec!(5), dec!(0), dec!(0), 0);
        assert_eq!(evaluate(SignalType::Sell, Some(&s)), SentimentDecision::Warn("extreme_fear"));
    }

    #[test]
    fn executes_when_no_sentiment_available() {
        assert_eq!(evaluate(SignalType::Buy, None), SentimentDecision::Execute);
    }
}
