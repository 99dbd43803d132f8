//! Domain module - the three constraint categories and their priority order

/// Constraint domain of an observation or element
///
/// A flat tag; cross-domain precedence is expressed by [`PriorityTable`],
/// not by any hierarchy between the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    /// Screens, software, networks
    Digital,

    /// Bodies, buildings, vehicles
    Physical,

    /// Law and policy
    Constitutional,
}

impl Domain {
    /// All domains, in declaration order
    pub const ALL: [Domain; 3] = [Domain::Digital, Domain::Physical, Domain::Constitutional];

    /// Get the domain name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Digital => "digital",
            Domain::Physical => "physical",
            Domain::Constitutional => "constitutional",
        }
    }

    /// Parse a domain from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "digital" => Some(Domain::Digital),
            "physical" => Some(Domain::Physical),
            "constitutional" => Some(Domain::Constitutional),
            _ => None,
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid domain: {}", s))
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit priority per domain; higher values override lower ones
///
/// A Constraint element blocks an edge when its priority is greater than or
/// equal to the strongest Agency element supporting that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityTable {
    /// Priority of digital elements
    pub digital: u8,
    /// Priority of physical elements
    pub physical: u8,
    /// Priority of constitutional elements
    pub constitutional: u8,
}

impl Default for PriorityTable {
    /// Digital and physical are peers; constitutional bounds both
    fn default() -> Self {
        Self {
            digital: 1,
            physical: 1,
            constitutional: 2,
        }
    }
}

impl PriorityTable {
    /// Priority assigned to a domain
    pub fn priority_of(&self, domain: Domain) -> u8 {
        match domain {
            Domain::Digital => self.digital,
            Domain::Physical => self.physical,
            Domain::Constitutional => self.constitutional,
        }
    }

    /// Check the table keeps constitutional strictly above the other domains
    pub fn validate(&self) -> Result<(), String> {
        if self.constitutional <= self.digital || self.constitutional <= self.physical {
            return Err(format!(
                "constitutional priority ({}) must exceed digital ({}) and physical ({})",
                self.constitutional, self.digital, self.physical
            ));
        }
        Ok(())
    }
}
