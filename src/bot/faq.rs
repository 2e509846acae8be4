//! FAQ browser with canned safety content

/// A browsable safety topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaqCategory {
    Ppe,
    Fire,
    Chemical,
    Electrical,
    Confined,
    Ergonomics,
    Training,
}

impl FaqCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ppe => "ppe",
            Self::Fire => "fire",
            Self::Chemical => "chemical",
            Self::Electrical => "electrical",
            Self::Confined => "confined",
            Self::Ergonomics => "ergonomics",
            Self::Training => "training",
        }
    }

    /// Parse a category from user input
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        match lower.as_str() {
            "1" | "ppe" => Some(Self::Ppe),
            "2" | "fire" => Some(Self::Fire),
            "3" | "chemical" => Some(Self::Chemical),
            "4" | "electrical" => Some(Self::Electrical),
            "5" | "confined" | "confined spaces" => Some(Self::Confined),
            "6" | "ergonomics" => Some(Self::Ergonomics),
            "7" | "training" => Some(Self::Training),
            _ => None,
        }
    }

    /// Canned content for this category
    #[must_use]
    pub const fn content(self) -> &'static str {
        match self {
            Self::Ppe => {
                "\u{1F9BA} Personal Protective Equipment\n\n\
                 \u{2022} Hard hats are mandatory in all construction and lifting zones\n\
                 \u{2022} Safety boots with toe caps on any worksite\n\
                 \u{2022} Eye protection for grinding, cutting, and chemical handling\n\
                 \u{2022} Hearing protection above 85 dB (most generators and compressors)\n\
                 \u{2022} Inspect PPE before each shift; report damaged gear to your supervisor"
            }
            Self::Fire => {
                "\u{1F525} Fire Safety\n\n\
                 \u{2022} Know your two nearest exits and your muster point\n\
                 \u{2022} Keep fire exits and extinguisher access clear at all times\n\
                 \u{2022} PASS technique: Pull, Aim, Squeeze, Sweep\n\
                 \u{2022} Never fight a fire larger than a waste bin\n\
                 \u{2022} Fire Service: 912"
            }
            Self::Chemical => {
                "\u{2697} Chemical Safety\n\n\
                 \u{2022} Read the Safety Data Sheet before handling any chemical\n\
                 \u{2022} Never mix cleaning agents, especially bleach and ammonia\n\
                 \u{2022} Store flammables away from ignition sources and direct sun\n\
                 \u{2022} Label every secondary container\n\
                 \u{2022} For spills: evacuate, ventilate, and report immediately"
            }
            Self::Electrical => {
                "\u{26A1} Electrical Safety\n\n\
                 \u{2022} Treat every conductor as live until verified de-energized\n\
                 \u{2022} Lock out and tag out before any maintenance\n\
                 \u{2022} No work on energized panels without authorization\n\
                 \u{2022} Keep 3 metres from overhead lines with any equipment\n\
                 \u{2022} Report damaged cords and outlets at once"
            }
            Self::Confined => {
                "\u{1F573} Confined Spaces\n\n\
                 \u{2022} Entry requires a permit and atmospheric testing\n\
                 \u{2022} Always station an attendant outside\n\
                 \u{2022} Never enter to rescue without breathing apparatus\n\
                 \u{2022} Continuous ventilation while occupied\n\
                 \u{2022} Tanks, vaults, silos, and trenches over 1.2m all count"
            }
            Self::Ergonomics => {
                "\u{1FAB4} Ergonomics\n\n\
                 \u{2022} Lift with your legs, load close to your body\n\
                 \u{2022} Get help or use equipment for loads over 25 kg\n\
                 \u{2022} Vary your posture; take micro-breaks every hour\n\
                 \u{2022} Position screens at eye level, elbows at 90 degrees\n\
                 \u{2022} Report early signs of strain before they become injuries"
            }
            Self::Training => {
                "\u{1F4DA} Training\n\n\
                 \u{2022} Site induction is required before first entry\n\
                 \u{2022} Annual refreshers: fire, first aid, PPE\n\
                 \u{2022} Task-specific training before operating machinery\n\
                 \u{2022} Ask your HSSE officer for the current training calendar\n\
                 \u{2022} Keep your certification cards on site"
            }
        }
    }
}

/// The FAQ category list screen
#[must_use]
pub fn category_menu() -> String {
    "\u{2753} Safety FAQ - pick a topic\n\n\
     1. PPE - Personal protective equipment\n\
     2. FIRE - Fire safety\n\
     3. CHEMICAL - Chemical handling\n\
     4. ELECTRICAL - Electrical safety\n\
     5. CONFINED - Confined spaces\n\
     6. ERGONOMICS - Lifting and posture\n\
     7. TRAINING - Required training\n\n\
     Reply with a number or topic name, or BACK for the main menu."
        .to_string()
}

/// Content screen for a category, with navigation hints
#[must_use]
pub fn category_screen(category: FaqCategory) -> String {
    format!(
        "{}\n\nAnother topic? Reply with its number, or BACK for the main menu.",
        category.content()
    )
}

/// Reply for input that isn't a category: exit FAQ mode gracefully
#[must_use]
pub fn exit_hint() -> &'static str {
    "(Leaving the FAQ. Type FAQ to return to the topic list.)"
}
