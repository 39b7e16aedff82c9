//! Request routing across engines and capability paths

mod router;

pub use router::{
    FormatPolicy, RouteOptions, RoutePlan, RoutedSynthesis, RouterConfig, SynthesisOutput,
    SynthesisRouter,
};
