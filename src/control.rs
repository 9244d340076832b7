use embassy_time::Instant;

use crate::config::OutputLink;
use crate::errors::FanTachError;
use crate::filters::PwmFilter;
use crate::freq_counter::FreqCounter;
use crate::pulse_counter::PulseCounters;
use crate::tacho_output::{SquareWaveGen, TachoOutputs};

/// One output mirroring one fan input through a filter
pub struct OutputRoute {
    source_fan: usize,
    filter: PwmFilter,
}

impl OutputRoute {
    pub fn new(source_fan: usize, filter: PwmFilter) -> Self {
        Self { source_fan, filter }
    }

    pub fn filter(&self) -> &PwmFilter {
        &self.filter
    }
}

/// Main loop side of the tachometer pipeline: sample, filter, regenerate.
pub struct ControlLoop<const N: usize, const M: usize> {
    sampler: FreqCounter<N>,
    routes: [OutputRoute; M],
}

impl<const N: usize, const M: usize> ControlLoop<N, M> {
    /// Builds the routes from `links`; a link pointing at a fan that does not exist is rejected.
    pub fn new(links: &[OutputLink; M], now: Instant) -> Result<Self, FanTachError> {
        if let Some(link) = links.iter().find(|link| link.source_fan >= N) {
            error!("Tacho output linked to missing fan {}", link.source_fan);
            return Err(FanTachError::SourceChannelOutOfRange(link.source_fan));
        }
        let routes = (*links).map(|link| {
            let filter = PwmFilter::from_config(link.filter, link.filter_args, now);
            OutputRoute::new(link.source_fan, filter)
        });
        for (output, route) in routes.iter().enumerate() {
            info!("tacho output {} <- fan {} (filter: {})", output, route.source_fan, route.filter.kind().name());
        }
        Ok(Self::with_routes(FreqCounter::new(now), routes))
    }

    pub fn with_routes(sampler: FreqCounter<N>, routes: [OutputRoute; M]) -> Self {
        Self { sampler, routes }
    }

    /// Polls the sampler and, when a new sample was taken, updates every output.
    /// Returns true if the outputs were updated.
    pub fn tick<G: SquareWaveGen>(
        &mut self,
        counters: &PulseCounters<N>,
        outputs: &mut TachoOutputs<G, M>,
        now: Instant,
    ) -> bool {
        if !self.sampler.update(counters, now) {
            return false;
        }
        for (output, route) in self.routes.iter_mut().enumerate() {
            let input = self.sampler.frequency(route.source_fan).unwrap_or(0.0);
            let freq = route.filter.apply(input as f32, now);
            // routes are validated against N and outputs have exactly M channels
            if let Err(e) = outputs.set_tacho_output_freq(output, freq as f64) {
                warn!("tacho output {} not updated: {:?}", output, e);
            }
        }
        true
    }

    pub fn sampler(&self) -> &FreqCounter<N> {
        &self.sampler
    }

    pub fn routes(&self) -> &[OutputRoute; M] {
        &self.routes
    }
}
