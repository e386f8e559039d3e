use std::collections::BTreeSet;

/// Sandbox grants beyond the minimal `allow-scripts allow-same-origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Forms,
    Popups,
    Modals,
    TopNavigation,
}

impl Capability {
    pub fn token(self) -> &'static str {
        match self {
            Self::Forms => "allow-forms",
            Self::Popups => "allow-popups",
            Self::Modals => "allow-modals",
            Self::TopNavigation => "allow-top-navigation",
        }
    }
}

const BASE_TOKENS: [&str; 2] = ["allow-scripts", "allow-same-origin"];

/// Capability grant for an embedded frame. Every opt-in is logged with the
/// reason given by the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxPolicy {
    opt_ins: BTreeSet<Capability>,
}

impl SandboxPolicy {
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn allow(mut self, capability: Capability, reason: &str) -> Self {
        if self.opt_ins.insert(capability) {
            tracing::info!(capability = capability.token(), reason, "sandbox capability opt-in");
        }
        self
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.opt_ins.contains(&capability)
    }

    pub fn opt_ins(&self) -> impl Iterator<Item = Capability> + '_ {
        self.opt_ins.iter().copied()
    }

    /// Value of the frame's `sandbox` attribute.
    pub fn attribute(&self) -> String {
        BASE_TOKENS
            .iter()
            .copied()
            .chain(self.opt_ins.iter().map(|capability| capability.token()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
