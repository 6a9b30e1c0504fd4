use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventKind {
    Burglary,
    Earthquake,
    Fire,
    MerchantArrival,
    Festival,
    ResearchSurge,
    MarketBoom,
    Drought,
    Epidemic,
}

string_enum!(EventKind {
    Burglary => "burglary",
    Earthquake => "earthquake",
    Fire => "fire",
    MerchantArrival => "merchant_arrival",
    Festival => "festival",
    ResearchSurge => "research_surge",
    MarketBoom => "market_boom",
    Drought => "drought",
    Epidemic => "epidemic",
});

/// How an event's effect is shaped over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    /// Zero duration; everything happens in `start`.
    Instant,
    /// Pays `base * remaining / max` on each active tick.
    DecayingReward,
    /// Holds a flat modifier for the whole window, undone exactly once at the end.
    Constant,
}

impl EventKind {
    pub fn family(self) -> EventFamily {
        use EventKind::*;
        match self {
            Burglary | Earthquake | Fire | MerchantArrival => EventFamily::Instant,
            Festival | ResearchSurge => EventFamily::DecayingReward,
            MarketBoom | Drought | Epidemic => EventFamily::Constant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    #[default]
    Dormant,
    Active,
    /// Finished at least once; polled for eligibility like `Dormant`.
    Ended,
}

/// One catalog entry's live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    pub kind: EventKind,
    pub name: String,
    pub state: EventState,
    pub duration_remaining: u32,
    pub max_duration: u32,
    pub ticks_skipped_since_last_activation: u32,
    pub activation_count: u32,
    /// Reward magnitudes / modifier strengths; meaning depends on `kind`.
    pub params: Vec<f64>,
    pub start_message: String,
    pub end_message: String,
    /// Value a constant modifier replaced, restored verbatim at `end`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_value: Option<f64>,
}

impl WorldEvent {
    pub fn new(kind: EventKind, name: &str, max_duration: u32, params: Vec<f64>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            state: EventState::Dormant,
            duration_remaining: 0,
            max_duration,
            ticks_skipped_since_last_activation: 0,
            activation_count: 0,
            params,
            start_message: String::new(),
            end_message: String::new(),
            saved_value: None,
        }
    }

    /// Every catalog event, dormant, with its default duration and parameters.
    pub fn default_catalog() -> Vec<WorldEvent> {
        use EventKind::*;
        vec![
            WorldEvent::new(Burglary, "Burglary", 0, vec![0.1])
                .with_messages("Thieves broke into the treasury.", ""),
            WorldEvent::new(Earthquake, "Earthquake", 0, vec![0.5, 8.0])
                .with_messages("The ground shook beneath the city.", ""),
            WorldEvent::new(Fire, "Fire", 0, vec![0.6, 3.0])
                .with_messages("A fire broke out.", ""),
            WorldEvent::new(MerchantArrival, "Merchant Arrival", 0, vec![])
                .with_messages("A travelling merchant set up a stall.", ""),
            WorldEvent::new(Festival, "Festival", 8, vec![40.0]).with_messages(
                "A festival fills the streets with visitors.",
                "The festival has wound down.",
            ),
            WorldEvent::new(ResearchSurge, "Research Surge", 6, vec![5.0]).with_messages(
                "Local scholars are on a roll.",
                "The research surge has passed.",
            ),
            WorldEvent::new(MarketBoom, "Market Boom", 12, vec![1.5]).with_messages(
                "Traders are paying a premium.",
                "Market prices have settled.",
            ),
            WorldEvent::new(Drought, "Drought", 10, vec![0.5]).with_messages(
                "A drought is straining the water supply.",
                "The drought has broken.",
            ),
            WorldEvent::new(Epidemic, "Epidemic", 10, vec![0.8]).with_messages(
                "An illness is spreading through the workforce.",
                "The epidemic is over.",
            ),
        ]
    }

    pub fn with_messages(mut self, start: &str, end: &str) -> Self {
        self.start_message = start.to_string();
        self.end_message = end.to_string();
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == EventState::Active
    }

    pub fn param(&self, index: usize) -> f64 {
        self.params.get(index).copied().unwrap_or(0.0)
    }

    /// Current value of a decaying reward whose base is `base`.
    pub fn decayed(&self, base: f64) -> f64 {
        if self.max_duration == 0 {
            return 0.0;
        }
        base * self.duration_remaining as f64 / self.max_duration as f64
    }
}
