use bookcache_common::CacheResult;
use bookcache_keys::{InvalidationScope, KeyBuilder, TenantId};
use bookcache_store::CacheBackend;
use tracing::debug;

use crate::aside::{CacheAside, CachedValue};
use crate::model::{
    BookingFilters, BookingStats, BookingsPage, CustomerListParams, CustomersPage, Pagination,
    ReportQuery, RevenueData, StaffPerformance,
};
use crate::namespace::{Mutation, Namespace};
use crate::source::QuerySource;

/// Consultas de relatórios e listagens com cache-aside por tenant.
pub struct ReportsCache<B, S> {
    cache: CacheAside<B>,
    source: S,
}

impl<B, S> ReportsCache<B, S>
where
    B: CacheBackend<Value = CachedValue>,
    S: QuerySource,
{
    pub fn new(backend: B, source: S) -> Self {
        Self {
            cache: CacheAside::new(backend),
            source,
        }
    }

    pub fn cache(&self) -> &CacheAside<B> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn revenue(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> Result<RevenueData, S::Error> {
        let ns = Namespace::Revenue;
        self.cache
            .fetch(report_key(tenant, ns, query), ns.ttl(), || {
                self.source.revenue(tenant, query)
            })
            .await
    }

    pub async fn booking_stats(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> Result<BookingStats, S::Error> {
        let ns = Namespace::BookingStats;
        self.cache
            .fetch(report_key(tenant, ns, query), ns.ttl(), || {
                self.source.booking_stats(tenant, query)
            })
            .await
    }

    pub async fn staff_performance(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> Result<Vec<StaffPerformance>, S::Error> {
        let ns = Namespace::StaffPerformance;
        self.cache
            .fetch(report_key(tenant, ns, query), ns.ttl(), || {
                self.source.staff_performance(tenant, query)
            })
            .await
    }

    pub async fn bookings_list(
        &self,
        tenant: &TenantId,
        filters: &BookingFilters,
        pagination: Pagination,
    ) -> Result<BookingsPage, S::Error> {
        let ns = Namespace::BookingsList;
        let pagination = pagination.normalized();
        let key = KeyBuilder::new(tenant, ns)
            .json(filters)
            .part(pagination.page)
            .part(pagination.limit);
        self.cache
            .fetch(key, ns.ttl(), || {
                self.source.bookings(tenant, filters, pagination)
            })
            .await
    }

    pub async fn customers_list(
        &self,
        tenant: &TenantId,
        params: &CustomerListParams,
    ) -> Result<CustomersPage, S::Error> {
        let ns = Namespace::CustomersList;
        let params = CustomerListParams {
            pagination: params.pagination.normalized(),
            ..params.clone()
        };
        let key = KeyBuilder::new(tenant, ns).json(&params);
        self.cache
            .fetch(key, ns.ttl(), || self.source.customers(tenant, &params))
            .await
    }

    /// Remove todas as entradas de um namespace do tenant.
    pub fn invalidate_namespace(&self, tenant: &TenantId, ns: Namespace) -> CacheResult<usize> {
        let scope = InvalidationScope::new(tenant, ns)?;
        let removed = self.cache.invalidate(&scope)?;
        debug!("cache {ns} invalidado para {tenant}: {removed} entradas");
        Ok(removed)
    }

    pub fn invalidate_reports(&self, tenant: &TenantId) -> CacheResult<usize> {
        self.invalidate_all(tenant, &Namespace::REPORTS)
    }

    /// Invalidação grossa por namespace após uma escrita.
    pub fn on_mutation(&self, tenant: &TenantId, mutation: Mutation) -> CacheResult<usize> {
        self.invalidate_all(tenant, mutation.stale_namespaces())
    }

    fn invalidate_all(&self, tenant: &TenantId, namespaces: &[Namespace]) -> CacheResult<usize> {
        namespaces
            .iter()
            .try_fold(0, |acc, ns| Ok(acc + self.invalidate_namespace(tenant, *ns)?))
    }
}

fn report_key(tenant: &TenantId, ns: Namespace, query: &ReportQuery) -> KeyBuilder {
    KeyBuilder::new(tenant, ns)
        .part(query.range.start)
        .part(query.range.end)
        .part(
            query
                .location_id
                .as_deref()
                .filter(|l| !l.is_empty())
                .unwrap_or("all"),
        )
}
