mod workload;

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use tokio::time::Duration;
use tracing::{debug, info};

use bookcache_common::{CacheConfig, DEFAULT_TTL, SWEEP_INTERVAL};
use bookcache_keys::TenantId;
use bookcache_reports::{
    BookingFilters, BookingStatus, CachedValue, CustomerListParams, DateRange, Mutation,
    Pagination, ReportQuery, ReportsCache,
};
use bookcache_store::TtlStore;

use crate::workload::MemorySource;

#[derive(Parser, Debug)]
#[command(
    name = "bookcache-cli",
    about = "bookcache: simula carga de relatórios sobre o cache TTL"
)]
struct Args {
    /// Número de merchants simulados
    #[arg(long, default_value_t = 3)]
    tenants: usize,
    /// Agendamentos iniciais por merchant
    #[arg(long, default_value_t = 200)]
    bookings: usize,
    /// Total de consultas a executar
    #[arg(long, default_value_t = 500)]
    requests: usize,
    /// Uma mutação (agendamento/pagamento) a cada N consultas; 0 desliga
    #[arg(long, default_value_t = 50)]
    mutation_every: usize,
    /// Workers concorrentes disparando consultas
    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long, default_value_t = 5)]
    source_latency_ms: u64,
    #[arg(long, default_value_t = DEFAULT_TTL.as_millis() as u64)]
    default_ttl_ms: u64,
    #[arg(long, default_value_t = SWEEP_INTERVAL.as_millis() as u64)]
    sweep_interval_ms: u64,
}

type Reports = ReportsCache<TtlStore<CachedValue>, MemorySource>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookcache_cli=info".into()),
        )
        .init();

    let args = Args::parse();
    if args.tenants == 0 {
        anyhow::bail!("--tenants deve ser maior que zero");
    }

    let config = CacheConfig::from_millis(args.default_ttl_ms, args.sweep_interval_ms);
    let store: TtlStore<CachedValue> = TtlStore::new(config);
    let source = MemorySource::seeded(
        args.tenants,
        args.bookings,
        Duration::from_millis(args.source_latency_ms),
    );
    let tenants = Arc::new(source.tenant_ids()?);
    let reports = Arc::new(ReportsCache::new(store.clone(), source));

    info!(
        "{} merchants, {} consultas, {} workers, ttl padrão {:?}",
        args.tenants, args.requests, args.workers, config.default_ttl
    );

    let workers = args.workers.max(1);
    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let reports = reports.clone();
        let tenants = tenants.clone();
        let requests = args.requests;
        let mutation_every = args.mutation_every;
        handles.push(tokio::spawn(async move {
            let mut seq = worker;
            while seq < requests {
                let tenant = &tenants[seq % tenants.len()];
                run_request(&reports, tenant, seq).await?;
                if mutation_every > 0 && seq > 0 && seq % mutation_every == 0 {
                    mutate(&reports, tenant, seq)?;
                }
                seq += workers;
            }
            anyhow::Ok(())
        }));
    }

    for h in handles {
        h.await??;
    }

    let stats = store.stats();
    store.stop();

    println!("consultas:          {}", args.requests);
    println!("chamadas à fonte:   {}", reports.source().calls());
    println!("hits / misses:      {} / {}", stats.hits, stats.misses);
    println!("hit ratio:          {:.1}%", stats.hit_ratio() * 100.0);
    println!("entradas em cache:  {}", stats.entries);
    println!("expiradas:          {}", stats.expired);
    println!("invalidadas:        {}", stats.invalidated);

    Ok(())
}

/// Intervalos mensais fixos do primeiro semestre de 2024.
fn month(seq: usize) -> DateRange {
    // 2024-01-01T00:00:00Z
    let year_start = DateTime::<Utc>::UNIX_EPOCH + ChronoDuration::seconds(1_704_067_200);
    let start = year_start + ChronoDuration::days(30 * (seq % 6) as i64);
    DateRange::new(start, start + ChronoDuration::days(30) - ChronoDuration::seconds(1))
}

async fn run_request(reports: &Reports, tenant: &TenantId, seq: usize) -> anyhow::Result<()> {
    let mut query = ReportQuery::new(month(seq / 7));
    if seq % 3 == 0 {
        query = query.at_location("loc-1");
    }

    match seq % 5 {
        0 => {
            let revenue = reports.revenue(tenant, &query).await?;
            debug!("{tenant} receita: {} centavos", revenue.total_cents);
        }
        1 => {
            let stats = reports.booking_stats(tenant, &query).await?;
            debug!("{tenant} agendamentos: {}", stats.total);
        }
        2 => {
            let rows = reports.staff_performance(tenant, &query).await?;
            debug!("{tenant} profissionais: {}", rows.len());
        }
        3 => {
            let filters = BookingFilters {
                status: (seq % 2 == 0).then_some(BookingStatus::Completed),
                start_date: Some(query.range.start),
                end_date: Some(query.range.end),
                ..Default::default()
            };
            let page = Pagination::normalize(Some((seq % 3) as u32 + 1), None);
            let page = reports.bookings_list(tenant, &filters, page).await?;
            debug!("{tenant} página de agendamentos: {}/{}", page.page, page.total_pages);
        }
        _ => {
            let params = CustomerListParams {
                search: (seq % 4 == 0).then(|| "cliente 1".to_string()),
                ..Default::default()
            };
            let page = reports.customers_list(tenant, &params).await?;
            debug!("{tenant} clientes: {}", page.total);
        }
    }
    Ok(())
}

fn mutate(reports: &Reports, tenant: &TenantId, seq: usize) -> anyhow::Result<()> {
    let mutation = if seq % 2 == 0 {
        reports.source().create_booking(tenant)?;
        Mutation::BookingCreated
    } else if reports.source().record_payment(tenant)? {
        Mutation::PaymentRecorded
    } else {
        return Ok(());
    };

    let removed = reports.on_mutation(tenant, mutation)?;
    info!("{tenant}: {mutation:?}, {removed} entradas invalidadas");
    Ok(())
}
