use std::time::Duration;

pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_millis(50);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Espera exponencial acotada entre pedidos sin respuesta útil.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Devuelve la espera actual y duplica la siguiente (hasta `max`).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }

    pub async fn wait(&mut self) {
        tokio::time::sleep(self.next_delay()).await;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MIN, DEFAULT_BACKOFF_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplica_hasta_el_tope() {
        let mut b = Backoff::default();
        let delays: Vec<u128> = (0..8).map(|_| b.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![50, 100, 200, 400, 800, 1000, 1000, 1000]);
    }

    #[test]
    fn reset_vuelve_al_minimo() {
        let mut b = Backoff::new(Duration::from_millis(10), Duration::from_millis(40));
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn max_menor_que_min_se_ajusta() {
        let mut b = Backoff::new(Duration::from_millis(30), Duration::from_millis(5));
        assert_eq!(b.next_delay(), Duration::from_millis(30));
        assert_eq!(b.next_delay(), Duration::from_millis(30));
    }
}
