use std::fmt;

use tokio::time::Duration;

use bookcache_common::{CUSTOMER_LIST_TTL, LIST_TTL, REPORT_TTL};

/// Namespaces de cache usados pelas consultas de relatórios e listagens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Revenue,
    BookingStats,
    StaffPerformance,
    BookingsList,
    CustomersList,
}

impl Namespace {
    /// Agregados pesados de relatórios.
    pub const REPORTS: [Namespace; 3] = [
        Namespace::Revenue,
        Namespace::BookingStats,
        Namespace::StaffPerformance,
    ];

    pub const ALL: [Namespace; 5] = [
        Namespace::Revenue,
        Namespace::BookingStats,
        Namespace::StaffPerformance,
        Namespace::BookingsList,
        Namespace::CustomersList,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Revenue => "revenue",
            Namespace::BookingStats => "booking-stats",
            Namespace::StaffPerformance => "staff-performance",
            Namespace::BookingsList => "bookings-list",
            Namespace::CustomersList => "customers-list",
        }
    }

    /// TTL conforme a volatilidade: listagens curtas, relatórios longos.
    pub fn ttl(self) -> Duration {
        match self {
            Namespace::Revenue | Namespace::BookingStats | Namespace::StaffPerformance => {
                REPORT_TTL
            }
            Namespace::BookingsList => LIST_TTL,
            Namespace::CustomersList => CUSTOMER_LIST_TTL,
        }
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escrita que pode deixar resultados em cache desatualizados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    BookingCreated,
    BookingUpdated,
    BookingCancelled,
    /// Reatribuição do cliente de um agendamento.
    BookingCustomerChanged,
    PaymentRecorded,
    OrderCompleted,
    CustomerChanged,
    LoyaltyAdjusted,
    StaffChanged,
}

impl Mutation {
    /// Namespaces a invalidar (por tenant) após esta mutação.
    pub fn stale_namespaces(self) -> &'static [Namespace] {
        use Namespace::*;

        match self {
            Mutation::BookingCreated | Mutation::BookingUpdated | Mutation::BookingCancelled => {
                &[BookingsList, Revenue, BookingStats, StaffPerformance]
            }
            Mutation::BookingCustomerChanged => &[BookingsList, CustomersList],
            Mutation::PaymentRecorded | Mutation::OrderCompleted => {
                &[BookingsList, Revenue, BookingStats, StaffPerformance]
            }
            Mutation::CustomerChanged | Mutation::LoyaltyAdjusted => &[CustomersList],
            Mutation::StaffChanged => &[StaffPerformance],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_delimiter_free() {
        let mut names: Vec<_> = Namespace::ALL.iter().map(|ns| ns.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Namespace::ALL.len());
        assert!(names.iter().all(|n| !n.contains(':')));
    }

    #[test]
    fn ttls() {
        assert_eq!(Namespace::Revenue.ttl(), Duration::from_secs(600));
        assert_eq!(Namespace::BookingsList.ttl(), Duration::from_secs(60));
        assert_eq!(Namespace::CustomersList.ttl(), Duration::from_secs(120));
    }

    #[test]
    fn payments_invalidate_every_report() {
        let stale = Mutation::PaymentRecorded.stale_namespaces();
        for ns in Namespace::REPORTS {
            assert!(stale.contains(&ns), "{ns} deveria ser invalidado");
        }
        assert!(!stale.contains(&Namespace::CustomersList));
    }

    #[test]
    fn customer_reassignment_touches_both_lists() {
        assert_eq!(
            Mutation::BookingCustomerChanged.stale_namespaces(),
            &[Namespace::BookingsList, Namespace::CustomersList]
        );
    }
}
