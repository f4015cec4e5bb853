use crate::indicators::{Atr, ExponentialMovingAverage, Macd, MacdValue, RollingCvd, SimpleMovingAverage, Vwap, WilderRsi};
use halyard_instrument::Kline;
use rust_decimal::Decimal;

/// Warmup parameters and optional-indicator toggles for [`compute`].
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub ema_short: usize,
    pub ema_long: usize,
    pub rsi_period: usize,
    pub macd: Option<(usize, usize, usize)>,
    pub atr_period: Option<usize>,
    pub cvd_window: Option<usize>,
    pub volume_avg_period: usize,
}

impl IndicatorConfig {
    /// `max(maLong, rsiPeriod, macdSlow+macdSignal+1) + safety-buffer` per SPEC_FULL.md §4.3.
    fn warmup(&self) -> usize {
        const SAFETY_BUFFER: usize = 5;
        let macd_warmup = self.macd.map(|(_, slow, signal)| slow + signal + 1).unwrap_or(0);
        [self.ema_long, self.rsi_period, macd_warmup].into_iter().max().unwrap_or(0) + SAFETY_BUFFER
    }
}

/// Current value plus the prior tick's value, for rules that detect a cross (eg/
/// `ma_golden_cross`) rather than a level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithPrev<T> {
    pub current: T,
    pub previous: T,
}

/// Pure snapshot of every indicator value derived from a K-line suffix, at the timestamp of the
/// last K-line in the slice passed to [`compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub ema_short: WithPrev<Decimal>,
    pub ema_long: WithPrev<Decimal>,
    pub rsi: Decimal,
    pub macd: Option<WithPrev<MacdValue>>,
    pub atr: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub cvd: Option<Decimal>,
    pub buy_volume: Option<Decimal>,
    pub sell_volume: Option<Decimal>,
    pub volume: Decimal,
    pub volume_average: Decimal,
}

impl IndicatorSnapshot {
    pub fn volume_surge(&self, multiplier: Decimal) -> bool {
        self.volume_average > Decimal::ZERO && self.volume > self.volume_average * multiplier
    }

    pub fn volume_low(&self, multiplier: Decimal) -> bool {
        self.volume_average > Decimal::ZERO && self.volume < self.volume_average * multiplier
    }
}

/// Replays every indicator over `klines` from scratch and returns the resulting snapshot, or
/// `None` if fewer than the required warmup bars are available. Callers (the Signal Pipeline)
/// must tolerate `None` and silently skip the symbol for that tick.
pub fn compute(klines: &[Kline], config: &IndicatorConfig) -> Option<IndicatorSnapshot> {
    if klines.len() < config.warmup() {
        return None;
    }

    let mut ema_short = ExponentialMovingAverage::new(config.ema_short);
    let mut ema_long = ExponentialMovingAverage::new(config.ema_long);
    let mut rsi = WilderRsi::new(config.rsi_period);
    let mut macd = config.macd.map(|(fast, slow, signal)| Macd::new(fast, slow, signal));
    let mut atr = config.atr_period.map(Atr::new);
    let mut vwap = Vwap::new();
    let mut cvd = config.cvd_window.map(RollingCvd::new);
    let mut volume_avg = SimpleMovingAverage::new(config.volume_avg_period);

    let mut ema_short_value = Decimal::ZERO;
    let mut ema_short_prev = Decimal::ZERO;
    let mut ema_long_value = Decimal::ZERO;
    let mut ema_long_prev = Decimal::ZERO;
    let mut rsi_value = Decimal::ZERO;
    let mut macd_value: Option<MacdValue> = None;
    let mut macd_prev: Option<MacdValue> = None;
    let mut atr_value = None;
    let mut vwap_value = None;
    let mut cvd_value = None;
    let mut buy_volume = None;
    let mut sell_volume = None;

    for kline in klines {
        ema_short_prev = ema_short_value;
        ema_long_prev = ema_long_value;
        macd_prev = macd_value;

        ema_short_value = ema_short.update(kline.close);
        ema_long_value = ema_long.update(kline.close);
        if let Some(v) = rsi.update(kline.close) {
            rsi_value = v;
        }
        if let Some(m) = macd.as_mut() {
            macd_value = Some(m.update(kline.close));
        }
        if let Some(a) = atr.as_mut() {
            atr_value = a.update(kline.high, kline.low, kline.close);
        }
        vwap_value = vwap.update(kline.high, kline.low, kline.close, kline.volume);
        if let Some(c) = cvd.as_mut() {
            cvd_value = Some(c.update(kline.close, kline.volume));
            buy_volume = Some(c.buy_volume());
            sell_volume = Some(c.sell_volume());
        }
        volume_avg.update(kline.volume);
    }

    Some(IndicatorSnapshot {
        ema_short: WithPrev { current: ema_short_value, previous: ema_short_prev },
        ema_long: WithPrev { current: ema_long_value, previous: ema_long_prev },
        rsi: rsi_value,
        macd: macd_value.map(|current| WithPrev { current, previous: macd_prev.unwrap_or(current) }),
        atr: atr_value,
        vwap: vwap_value,
        cvd: cvd_value,
        buy_volume,
        sell_volume,
        volume: klines.last().map(|k| k.volume).unwrap_or(Decimal::ZERO),
        volume_average: volume_avg.average(),
    })
}
