use std::future::Future;

use bookcache_keys::TenantId;

use crate::model::{
    BookingFilters, BookingStats, BookingsPage, CustomerListParams, CustomersPage, Pagination,
    ReportQuery, RevenueData, StaffPerformance,
};

/// Fonte autoritativa das consultas (o banco, em produção).
///
/// O cache nunca inspeciona a fonte: só chama no miss e grava o resultado.
pub trait QuerySource: Send + Sync {
    type Error: Send;

    fn revenue(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> impl Future<Output = Result<RevenueData, Self::Error>> + Send;

    fn booking_stats(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> impl Future<Output = Result<BookingStats, Self::Error>> + Send;

    fn staff_performance(
        &self,
        tenant: &TenantId,
        query: &ReportQuery,
    ) -> impl Future<Output = Result<Vec<StaffPerformance>, Self::Error>> + Send;

    fn bookings(
        &self,
        tenant: &TenantId,
        filters: &BookingFilters,
        pagination: Pagination,
    ) -> impl Future<Output = Result<BookingsPage, Self::Error>> + Send;

    fn customers(
        &self,
        tenant: &TenantId,
        params: &CustomerListParams,
    ) -> impl Future<Output = Result<CustomersPage, Self::Error>> + Send;
}
