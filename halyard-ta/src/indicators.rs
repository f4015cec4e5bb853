use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple moving average indicator.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
}

impl SimpleMovingAverage {
    /// Create a new SMA with the given period.
    pub fn new(period: usize) -> Self {
        Self { period, values: VecDeque::new(), sum: Decimal::ZERO }
    }

    /// Update the SMA with a new value and return the latest average.
    pub fn update(&mut self, value: Decimal) -> Decimal {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.average()
    }

    /// Current average value.
    pub fn average(&self) -> Decimal {
        if self.values.is_empty() {
            Decimal::ZERO
        } else {
            self.sum / Decimal::from(self.values.len() as u64)
        }
    }

    /// True once `period` values have been fed in.
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.period
    }
}

/// Exponential moving average indicator.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    multiplier: Decimal,
    value: Option<Decimal>,
}

impl ExponentialMovingAverage {
    /// Create a new EMA with the given period.
    pub fn new(period: usize) -> Self {
        let multiplier = Decimal::from(2u64) / Decimal::from(period as u64 + 1);
        Self { multiplier, value: None }
    }

    /// Update the EMA with a new price and return the latest value.
    pub fn update(&mut self, price: Decimal) -> Decimal {
        match self.value {
            Some(val) => {
                let next = (price - val) * self.multiplier + val;
                self.value = Some(next);
                next
            }
            None => {
                self.value = Some(price);
                price
            }
        }
    }

    /// Current EMA value if initialised.
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

/// Wilder's RSI. The first average gain/loss is a plain mean over `period` deltas; every
/// subsequent update folds in the new delta at weight `1/period`, matching the smoothing
/// convention used by most charting platforms.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_price: Option<Decimal>,
    avg_gain: Decimal,
    avg_loss: Decimal,
    seed_gains: Vec<Decimal>,
    seed_losses: Vec<Decimal>,
    seeded: bool,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_price: None,
            avg_gain: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            seed_gains: Vec::with_capacity(period),
            seed_losses: Vec::with_capacity(period),
            seeded: false,
        }
    }

    /// Feed one price, returning `Some(rsi)` once warmup (`period + 1` prices) has elapsed.
    pub fn update(&mut self, price: Decimal) -> Option<Decimal> {
        let prev = self.prev_price.replace(price)?;
        let delta = price - prev;
        let (gain, loss) = if delta >= Decimal::ZERO {
            (delta, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -delta)
        };

        if !self.seeded {
            self.seed_gains.push(gain);
            self.seed_losses.push(loss);
            if self.seed_gains.len() < self.period {
                return None;
            }
            let n = Decimal::from(self.period as u64);
            self.avg_gain = self.seed_gains.iter().sum::<Decimal>() / n;
            self.avg_loss = self.seed_losses.iter().sum::<Decimal>() / n;
            self.seeded = true;
        } else {
            let n = Decimal::from(self.period as u64);
            self.avg_gain = (self.avg_gain * (n - Decimal::ONE) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - Decimal::ONE) + loss) / n;
        }

        Some(self.rsi())
    }

    fn rsi(&self) -> Decimal {
        if self.avg_loss.is_zero() {
            return Decimal::from(100u8);
        }
        let rs = self.avg_gain / self.avg_loss;
        Decimal::from(100u8) - Decimal::from(100u8) / (Decimal::ONE + rs)
    }
}

/// MACD line, signal line and histogram, computed from EMA(fast) - EMA(slow).
#[derive(Debug, Clone)]
pub struct Macd {
    fast: ExponentialMovingAverage,
    slow: ExponentialMovingAverage,
    signal: ExponentialMovingAverage,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: ExponentialMovingAverage::new(fast),
            slow: ExponentialMovingAverage::new(slow),
            signal: ExponentialMovingAverage::new(signal),
        }
    }

    pub fn update(&mut self, price: Decimal) -> MacdValue {
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);
        let macd = fast - slow;
        let signal = self.signal.update(macd);
        MacdValue { macd, signal, histogram: macd - signal }
    }
}

/// Wilder's Average True Range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<Decimal>,
    avg: Option<Decimal>,
    seed: Vec<Decimal>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period, prev_close: None, avg: None, seed: Vec::with_capacity(period) }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let true_range = match self.prev_close {
            Some(prev) => (high - low).max((high - prev).abs()).max((low - prev).abs()),
            None => high - low,
        };
        self.prev_close = Some(close);

        match self.avg {
            Some(avg) => {
                let n = Decimal::from(self.period as u64);
                let next = (avg * (n - Decimal::ONE) + true_range) / n;
                self.avg = Some(next);
                Some(next)
            }
            None => {
                self.seed.push(true_range);
                if self.seed.len() < self.period {
                    return None;
                }
                let avg = self.seed.iter().sum::<Decimal>() / Decimal::from(self.period as u64);
                self.avg = Some(avg);
                Some(avg)
            }
        }
    }
}

/// Session-cumulative VWAP: `sum(typical_price * volume) / sum(volume)` over every candle fed
/// in so far. Callers start a fresh `Vwap` per session boundary (eg/ UTC day) if a rolling
/// rather than all-time VWAP is wanted.
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cum_pv: Decimal,
    cum_volume: Decimal,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal, volume: Decimal) -> Option<Decimal> {
        let typical = (high + low + close) / Decimal::from(3u8);
        self.cum_pv += typical * volume;
        self.cum_volume += volume;
        if self.cum_volume.is_zero() {
            None
        } else {
            Some(self.cum_pv / self.cum_volume)
        }
    }
}

/// Rolling cumulative volume delta over a fixed window of candles: buy volume is approximated
/// as the candle volume on up-closes, sell volume on down-closes, split evenly on a flat close.
#[derive(Debug, Clone)]
pub struct RollingCvd {
    window: VecDeque<Decimal>,
    capacity: usize,
    prev_close: Option<Decimal>,
    cvd: Decimal,
    buy_volume: Decimal,
    sell_volume: Decimal,
}

impl RollingCvd {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            prev_close: None,
            cvd: Decimal::ZERO,
            buy_volume: Decimal::ZERO,
            sell_volume: Decimal::ZERO,
        }
    }

    pub fn update(&mut self, close: Decimal, volume: Decimal) -> Decimal {
        let delta = match self.prev_close {
            Some(prev) if close > prev => volume,
            Some(prev) if close < prev => -volume,
            _ => Decimal::ZERO,
        };
        self.prev_close = Some(close);
        self.window.push_back(delta);
        self.cvd += delta;
        if delta > Decimal::ZERO {
            self.buy_volume += delta;
        } else {
            self.sell_volume += -delta;
        }
        if self.window.len() > self.capacity {
            if let Some(old) = self.window.pop_front() {
                self.cvd -= old;
                if old > Decimal::ZERO {
                    self.buy_volume -= old;
                } else {
                    self.sell_volume -= -old;
                }
            }
        }
        self.cvd
    }

    pub fn buy_volume(&self) -> Decimal {
        self.buy_volume
    }

    pub fn sell_volume(&self) -> Decimal {
        self.sell_volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_and_ema_basics() {
        let mut sma = SimpleMovingAverage::new(3);
        assert_eq!(sma.update(dec!(1)), dec!(1));
        assert_eq!(sma.update(dec!(2)), dec!(1.5));
        assert_eq!(sma.update(dec!(3)), dec!(2));
        assert_eq!(sma.update(dec!(4)), dec!(3));

        let mut ema = ExponentialMovingAverage::new(3);
        assert_eq!(ema.update(dec!(1)), dec!(1));
        assert!(ema.update(dec!(2)) > dec!(1));
    }

    #[test]
    fn wilder_rsi_all_gains_is_100() {
        let mut rsi = WilderRsi::new(3);
        assert_eq!(rsi.update(dec!(10)), None);
        assert_eq!(rsi.update(dec!(11)), None);
        assert_eq!(rsi.update(dec!(12)), None);
        let value = rsi.update(dec!(13)).unwrap();
        assert_eq!(value, dec!(100));
    }

    #[test]
    fn atr_warmup_then_smooths() {
        let mut atr = Atr::new(2);
        assert!(atr.update(dec!(10), dec!(8), dec!(9)).is_none());
        let second = atr.update(dec!(11), dec!(9), dec!(10)).unwrap();
        assert!(second > Decimal::ZERO);
    }

    #[test]
    fn vwap_is_volume_weighted() {
        let mut vwap = Vwap::new();
        vwap.update(dec!(10), dec!(8), dec!(9), dec!(100));
        let v = vwap.update(dec!(20), dec!(18), dec!(19), dec!(100)).unwrap();
        assert_eq!(v, dec!(14));
    }

    #[test]
    fn rolling_cvd_tracks_buy_and_sell_volume() {
        let mut cvd = RollingCvd::new(3);
        cvd.update(dec!(10), dec!(5));
        let v = cvd.update(dec!(11), dec!(3));
        assert_eq!(v, dec!(3));
        assert_eq!(cvd.buy_volume(), dec!(3));
        assert_eq!(cvd.sell_volume(), dec!(0));
    }
}
