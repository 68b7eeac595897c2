use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::time::Duration;

use bookcache_keys::TenantId;
use bookcache_reports::{
    BookingFilters, BookingListItem, BookingStats, BookingStatus, BookingsPage,
    CustomerListItem, CustomerListParams, CustomersPage, Page, Pagination, QuerySource,
    ReportQuery, RevenueData, SortOrder, StaffPerformance,
};

const STAFF: [(&str, &str); 4] = [
    ("s1", "Ana Souza"),
    ("s2", "Bruno Lima"),
    ("s3", "Carla Dias"),
    ("s4", "Diego Alves"),
];
const SERVICES: [(&str, i64); 3] = [("Corte", 4_500), ("Coloração", 12_000), ("Barba", 3_000)];
const PAYMENT_METHODS: [&str; 3] = ["CARD", "CASH", "VOUCHER"];
const LOCATIONS: [&str; 2] = ["loc-1", "loc-2"];

#[derive(Debug, Clone)]
struct Booking {
    id: String,
    customer_id: String,
    customer_name: String,
    staff: usize,
    service: usize,
    location_id: &'static str,
    start: DateTime<Utc>,
    minutes: i64,
    status: BookingStatus,
    product_cents: i64,
    payment_method: &'static str,
}

impl Booking {
    /// Agendamento sintético determinístico a partir de um número de sequência.
    fn synthetic(seq: usize) -> Self {
        // 2024-01-01T09:00:00Z
        let base = DateTime::<Utc>::UNIX_EPOCH + ChronoDuration::seconds(1_704_099_600);
        let status = match seq % 10 {
            0 => BookingStatus::Cancelled,
            1 => BookingStatus::NoShow,
            2 | 3 => BookingStatus::Confirmed,
            _ => BookingStatus::Completed,
        };
        let customer = seq % 37;
        Self {
            id: format!("b{seq}"),
            customer_id: format!("c{customer}"),
            customer_name: format!("Cliente {customer}"),
            staff: seq % STAFF.len(),
            service: seq % SERVICES.len(),
            location_id: LOCATIONS[seq % LOCATIONS.len()],
            start: base + ChronoDuration::hours((seq as i64 * 7) % (24 * 180)),
            minutes: 30 + 15 * (seq as i64 % 4),
            status,
            product_cents: if seq % 3 == 0 { 1_500 } else { 0 },
            payment_method: PAYMENT_METHODS[seq % PAYMENT_METHODS.len()],
        }
    }

    fn service_cents(&self) -> i64 {
        SERVICES[self.service].1
    }

    fn in_report(&self, query: &ReportQuery) -> bool {
        query.range.contains(self.start)
            && query
                .location_id
                .as_deref()
                .is_none_or(|loc| loc == self.location_id)
    }
}

/// Fonte autoritativa in-memory com latência simulada.
pub struct MemorySource {
    bookings: RwLock<HashMap<String, Vec<Booking>>>,
    latency: Duration,
    calls: AtomicU64,
    next_seq: AtomicU64,
}

impl MemorySource {
    pub fn seeded(tenants: usize, bookings_per_tenant: usize, latency: Duration) -> Self {
        let mut bookings = HashMap::new();
        for t in 0..tenants {
            let list = (0..bookings_per_tenant)
                .map(|i| Booking::synthetic(t * bookings_per_tenant + i))
                .collect();
            bookings.insert(format!("merchant-{t}"), list);
        }
        Self {
            bookings: RwLock::new(bookings),
            latency,
            calls: AtomicU64::new(0),
            next_seq: AtomicU64::new((tenants * bookings_per_tenant) as u64),
        }
    }

    pub fn tenant_ids(&self) -> anyhow::Result<Vec<TenantId>> {
        let bookings = self.bookings.read().map_err(|_| anyhow!("lock envenenado"))?;
        let mut ids: Vec<_> = bookings
            .keys()
            .map(|k| TenantId::new(k.as_str()))
            .collect::<Result<_, _>>()?;
        ids.sort();
        Ok(ids)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Cria um agendamento novo para o tenant.
    pub fn create_booking(&self, tenant: &TenantId) -> anyhow::Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) as usize;
        let mut bookings = self.bookings.write().map_err(|_| anyhow!("lock envenenado"))?;
        bookings
            .entry(tenant.to_string())
            .or_default()
            .push(Booking::synthetic(seq));
        Ok(())
    }

    /// Conclui e registra pagamento do primeiro agendamento confirmado.
    pub fn record_payment(&self, tenant: &TenantId) -> anyhow::Result<bool> {
        let mut bookings = self.bookings.write().map_err(|_| anyhow!("lock envenenado"))?;
        let Some(list) = bookings.get_mut(tenant.as_str()) else {
            return Ok(false);
        };
        match list.iter_mut().find(|b| b.status == BookingStatus::Confirmed) {
            Some(booking) => {
                booking.status = BookingStatus::Completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn load(&self, tenant: &TenantId) -> anyhow::Result<Vec<Booking>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.fetch_add(1, Ordering::Relaxed);
        let bookings = self.bookings.read().map_err(|_| anyhow!("lock envenenado"))?;
        bookings
            .get(tenant.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("tenant desconhecido: {tenant}"))
    }
}

impl QuerySource for MemorySource {
    type Error = anyhow::Error;

    async fn revenue(&self, tenant: &TenantId, query: &ReportQuery) -> anyhow::Result<RevenueData> {
        let bookings = self.load(tenant).await?;
        let mut data = RevenueData::default();
        for b in bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Completed && b.in_report(query))
        {
            let amount = b.service_cents() + b.product_cents;
            data.total_cents += amount;
            data.service_revenue_cents += b.service_cents();
            data.product_revenue_cents += b.product_cents;
            *data
                .by_payment_method
                .entry(b.payment_method.to_string())
                .or_default() += amount;
        }
        Ok(data)
    }

    async fn booking_stats(&self, tenant: &TenantId, query: &ReportQuery) -> anyhow::Result<BookingStats> {
        let bookings = self.load(tenant).await?;
        let matching: Vec<_> = bookings.iter().filter(|b| b.in_report(query)).collect();
        let count = |status: BookingStatus| matching.iter().filter(|b| b.status == status).count() as u64;
        let total_minutes: i64 = matching.iter().map(|b| b.minutes).sum();
        let customers: BTreeSet<_> = matching.iter().map(|b| b.customer_id.as_str()).collect();

        Ok(BookingStats {
            total: matching.len() as u64,
            completed: count(BookingStatus::Completed),
            cancelled: count(BookingStatus::Cancelled),
            no_shows: count(BookingStatus::NoShow),
            avg_duration_minutes: if matching.is_empty() {
                0.0
            } else {
                total_minutes as f64 / matching.len() as f64
            },
            unique_customers: customers.len() as u64,
        })
    }

    async fn staff_performance(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> anyhow::Result<Vec<StaffPerformance>> {
        let bookings = self.load(tenant).await?;
        let mut rows: Vec<StaffPerformance> = STAFF
            .iter()
            .enumerate()
            .map(|(i, (id, name))| {
                let mine: Vec<_> = bookings
                    .iter()
                    .filter(|b| b.staff == i && b.in_report(query))
                    .collect();
                let customers: BTreeSet<_> = mine.iter().map(|b| b.customer_id.as_str()).collect();
                let minutes: i64 = mine.iter().map(|b| b.minutes).sum();
                StaffPerformance {
                    id: id.to_string(),
                    name: name.to_string(),
                    total_bookings: mine.len() as u64,
                    completed_bookings: mine
                        .iter()
                        .filter(|b| b.status == BookingStatus::Completed)
                        .count() as u64,
                    total_revenue_cents: mine.iter().map(|b| b.service_cents() + b.product_cents).sum(),
                    unique_customers: customers.len() as u64,
                    avg_booking_duration_minutes: if mine.is_empty() {
                        0.0
                    } else {
                        minutes as f64 / mine.len() as f64
                    },
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total_revenue_cents.cmp(&a.total_revenue_cents));
        Ok(rows)
    }

    async fn bookings(
        &self,
        tenant: &TenantId,
        filters: &BookingFilters,
        pagination: Pagination,
    ) -> anyhow::Result<BookingsPage> {
        let bookings = self.load(tenant).await?;
        let mut matching: Vec<_> = bookings
            .iter()
            .filter(|b| {
                filters.staff_id.as_deref().is_none_or(|s| s == STAFF[b.staff].0)
                    && filters.customer_id.as_deref().is_none_or(|c| c == b.customer_id)
                    && filters.status.is_none_or(|s| s == b.status)
                    && filters.start_date.is_none_or(|d| b.start >= d)
                    && filters.end_date.is_none_or(|d| b.start <= d)
                    && filters.location_id.as_deref().is_none_or(|l| l == b.location_id)
            })
            .collect();
        matching.sort_by_key(|b| b.start);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .map(|b| BookingListItem {
                id: b.id.clone(),
                customer_name: b.customer_name.clone(),
                staff_name: Some(STAFF[b.staff].1.to_string()),
                service_name: SERVICES[b.service].0.to_string(),
                start_time: b.start,
                end_time: b.start + ChronoDuration::minutes(b.minutes),
                status: b.status,
                total_cents: b.service_cents() + b.product_cents,
            })
            .collect();
        Ok(Page::new(items, total, pagination))
    }

    async fn customers(
        &self,
        tenant: &TenantId,
        params: &CustomerListParams,
    ) -> anyhow::Result<CustomersPage> {
        let bookings = self.load(tenant).await?;
        let mut by_customer: BTreeMap<&str, CustomerListItem> = BTreeMap::new();
        for b in &bookings {
            let item = by_customer
                .entry(b.customer_id.as_str())
                .or_insert_with(|| CustomerListItem {
                    id: b.customer_id.clone(),
                    first_name: "Cliente".to_string(),
                    last_name: b.customer_id.trim_start_matches('c').to_string(),
                    email: Some(format!("{}@example.com", b.customer_id)),
                    phone: None,
                    visit_count: 0,
                    total_spent_cents: 0,
                    loyalty_points: 0,
                });
            if b.status == BookingStatus::Completed {
                let spent = b.service_cents() + b.product_cents;
                item.visit_count += 1;
                item.total_spent_cents += spent;
                item.loyalty_points += spent / 100;
            }
        }

        let search = params.search.as_deref().map(str::to_lowercase);
        let mut items: Vec<_> = by_customer
            .into_values()
            .filter(|c| {
                search.as_deref().is_none_or(|q| {
                    format!("{} {}", c.first_name, c.last_name)
                        .to_lowercase()
                        .contains(q)
                })
            })
            .collect();
        match params.sort_by.as_deref() {
            Some("totalSpent") => items.sort_by_key(|c| c.total_spent_cents),
            Some("visitCount") => items.sort_by_key(|c| c.visit_count),
            _ => items.sort_by(|a, b| a.last_name.cmp(&b.last_name)),
        }
        if params.sort_order == Some(SortOrder::Desc) {
            items.reverse();
        }

        let pagination = params.pagination;
        let total = items.len() as u64;
        let page = items
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit as usize)
            .collect();
        Ok(Page::new(page, total, pagination))
    }
}
