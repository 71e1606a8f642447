use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use rust_embed::RustEmbed;
use tokio::sync::Mutex;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::error_handling::types::MergeError;
use crate::storage::merge::merge_and_archive;
use crate::storage::{ArchiveStore, PrimaryStore};
use crate::web_interface::types::{
    ApiError, ConnectionInfo, ConnectionListQuery, ConnectionListResponse, HostSummaryQuery,
    MergeRequest, MergeResponse, ReplaceHostRequest, ReplaceHostResponse, TrafficSummaryQuery,
};

/// Embedded dashboard bundle served next to the API.
#[derive(RustEmbed)]
#[folder = "ui/"]
struct Dashboard;

/// Web server for the HTTP API and the embedded dashboard.
pub struct WebServer {
    primary: PrimaryStore,
    archive: ArchiveStore,
    merge_lock: Arc<Mutex<()>>,
}

impl WebServer {
    pub fn new(primary: PrimaryStore, archive: ArchiveStore) -> Self {
        Self {
            primary,
            archive,
            merge_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Starts the web server on the given port. Runs until the process
    /// exits.
    pub async fn start(&self, port: u16) {
        // Clone shared deps into filters
        let primary_for_list = self.primary.clone();
        let primary_for_traffic = self.primary.clone();
        let primary_for_hosts = self.primary.clone();
        let primary_for_host_list = self.primary.clone();
        let primary_for_chains = self.primary.clone();
        let primary_for_merge = self.primary.clone();
        let primary_for_replace = self.primary.clone();
        let archive_for_merge = self.archive.clone();
        let merge_lock = Arc::clone(&self.merge_lock);

        // GET /api/connections -> paginated listing
        let list_connections = warp::path!("api" / "connections")
            .and(warp::get())
            .and(warp::query::<ConnectionListQuery>())
            .and_then(move |query: ConnectionListQuery| {
                let primary = primary_for_list.clone();
                async move {
                    let filter = query.into_filter();
                    match primary.list_connections(&filter).await {
                        Ok(page) => {
                            let page_size = filter.page_size as i64;
                            let total_pages = (page.total + page_size - 1) / page_size;
                            let response = ConnectionListResponse {
                                total: page.total,
                                page: filter.page,
                                page_size: filter.page_size,
                                total_pages,
                                data: page.records.into_iter().map(ConnectionInfo::from).collect(),
                            };
                            Ok::<_, Rejection>(
                                reply::with_status(reply::json(&response), StatusCode::OK)
                                    .into_response(),
                            )
                        }
                        Err(e) => {
                            error!("Connection listing failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Failed to load connections"))
                        }
                    }
                }
            });

        // GET /api/summary/traffic -> bucketed totals for the chart
        let traffic_summary = warp::path!("api" / "summary" / "traffic")
            .and(warp::get())
            .and(warp::query::<TrafficSummaryQuery>())
            .and_then(move |query: TrafficSummaryQuery| {
                let primary = primary_for_traffic.clone();
                async move {
                    let granularity = query.granularity();
                    let host = query.host.as_deref().filter(|h| !h.is_empty());
                    let start = query.start_date.filter(|v| *v > 0);
                    let end = query.end_date.filter(|v| *v > 0);
                    match primary.traffic_summary(host, granularity, start, end).await {
                        Ok(points) => Ok::<_, Rejection>(
                            reply::with_status(reply::json(&points), StatusCode::OK)
                                .into_response(),
                        ),
                        Err(e) => {
                            error!("Traffic summary failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Failed to load traffic summary"))
                        }
                    }
                }
            });

        // GET /api/summary/hosts -> per-host ranking
        let host_summary = warp::path!("api" / "summary" / "hosts")
            .and(warp::get())
            .and(warp::query::<HostSummaryQuery>())
            .and_then(move |query: HostSummaryQuery| {
                let primary = primary_for_hosts.clone();
                async move {
                    let limit = if query.limit == 0 { 10 } else { query.limit };
                    let start = query.start_date.filter(|v| *v > 0);
                    let end = query.end_date.filter(|v| *v > 0);
                    match primary.host_summary(limit, start, end).await {
                        Ok(hosts) => Ok::<_, Rejection>(
                            reply::with_status(reply::json(&hosts), StatusCode::OK)
                                .into_response(),
                        ),
                        Err(e) => {
                            error!("Host summary failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Failed to load host summary"))
                        }
                    }
                }
            });

        // GET /api/hosts -> distinct hosts for the filter dropdown
        let hosts = warp::path!("api" / "hosts")
            .and(warp::get())
            .and_then(move || {
                let primary = primary_for_host_list.clone();
                async move {
                    match primary.distinct_hosts().await {
                        Ok(list) => Ok::<_, Rejection>(
                            reply::with_status(reply::json(&list), StatusCode::OK).into_response(),
                        ),
                        Err(e) => {
                            error!("Host listing failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Failed to load hosts"))
                        }
                    }
                }
            });

        // GET /api/chains -> distinct exit chains for the filter dropdown
        let chains = warp::path!("api" / "chains")
            .and(warp::get())
            .and_then(move || {
                let primary = primary_for_chains.clone();
                async move {
                    match primary.distinct_chains().await {
                        Ok(list) => Ok::<_, Rejection>(
                            reply::with_status(reply::json(&list), StatusCode::OK).into_response(),
                        ),
                        Err(e) => {
                            error!("Chain listing failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Failed to load chains"))
                        }
                    }
                }
            });

        // POST /api/connections/merge -> roll a range up into buckets
        let merge = warp::path!("api" / "connections" / "merge")
            .and(warp::post())
            .and(warp::body::json())
            .and_then(move |request: MergeRequest| {
                let primary = primary_for_merge.clone();
                let archive = archive_for_merge.clone();
                let merge_lock = Arc::clone(&merge_lock);
                async move {
                    // One merge at a time; the engine carries no fencing of
                    // its own and overlapping runs would double-archive.
                    let _guard = merge_lock.lock().await;
                    match merge_and_archive(
                        &primary,
                        &archive,
                        request.start_date,
                        request.end_date,
                        request.interval,
                    )
                    .await
                    {
                        Ok(outcome) => {
                            // Space freed by the deletes is only reclaimed by
                            // a vacuum; failure does not undo the merge.
                            if let Err(e) = primary.vacuum().await {
                                error!("VACUUM after merge failed: {}", e);
                            }
                            let response = MergeResponse {
                                message: "merge completed".to_string(),
                                archived: outcome.archived,
                                merged: outcome.merged,
                            };
                            Ok::<_, Rejection>(
                                reply::with_status(reply::json(&response), StatusCode::OK)
                                    .into_response(),
                            )
                        }
                        Err(MergeError::InvalidRange(reason)) => Ok::<_, Rejection>(
                            reply::with_status(
                                reply::json(&ApiError { message: reason }),
                                StatusCode::BAD_REQUEST,
                            )
                            .into_response(),
                        ),
                        Err(e) => {
                            error!("Merge failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Merge failed"))
                        }
                    }
                }
            });

        // POST /api/connections/replace-host -> bulk suffix rewrite
        let replace_host = warp::path!("api" / "connections" / "replace-host")
            .and(warp::post())
            .and(warp::body::json())
            .and_then(move |request: ReplaceHostRequest| {
                let primary = primary_for_replace.clone();
                async move {
                    if request.domain_suffix.is_empty() {
                        return Ok::<_, Rejection>(
                            reply::with_status(
                                reply::json(&ApiError {
                                    message: "domain suffix must not be empty".to_string(),
                                }),
                                StatusCode::BAD_REQUEST,
                            )
                            .into_response(),
                        );
                    }

                    match primary.replace_host_suffix(&request.domain_suffix).await {
                        Ok(rows_affected) => {
                            info!(
                                "Rewrote {} hosts to suffix {}",
                                rows_affected, request.domain_suffix
                            );
                            let response = ReplaceHostResponse {
                                message: "replace completed".to_string(),
                                rows_affected,
                            };
                            Ok::<_, Rejection>(
                                reply::with_status(reply::json(&response), StatusCode::OK)
                                    .into_response(),
                            )
                        }
                        Err(e) => {
                            error!("Host replace failed: {}", e);
                            Ok::<_, Rejection>(internal_error("Host replace failed"))
                        }
                    }
                }
            });

        // GET / -> dashboard; unknown paths fall back to index.html so the
        // embedded single-page UI can route client-side.
        let index = warp::path::end()
            .and(warp::get())
            .and_then(|| async move { embedded_asset("index.html").ok_or_else(warp::reject::not_found) });

        let assets = warp::path::tail()
            .and(warp::get())
            .and_then(|tail: warp::path::Tail| async move {
                embedded_asset(tail.as_str()).ok_or_else(warp::reject::not_found)
            });

        // Compose routes
        let routes = list_connections
            .or(traffic_summary)
            .or(host_summary)
            .or(hosts)
            .or(chains)
            .or(merge)
            .or(replace_host)
            .or(index)
            .or(assets)
            .with(
                warp::cors()
                    .allow_any_origin()
                    .allow_headers(vec!["content-type"])
                    .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]),
            );

        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        info!("Web server listening on port {}", port);
        warp::serve(routes).run(addr).await;
    }
}

fn internal_error(message: &str) -> warp::reply::Response {
    reply::with_status(
        reply::json(&ApiError {
            message: message.to_string(),
        }),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

/// Looks an asset up in the embedded bundle, falling back to index.html.
fn embedded_asset(path: &str) -> Option<warp::reply::Response> {
    let (file, name) = match Dashboard::get(path) {
        Some(file) => (file, path),
        None => (Dashboard::get("index.html")?, "index.html"),
    };
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    Some(
        reply::with_header(file.data.into_owned(), "Content-Type", mime.to_string())
            .into_response(),
    )
}
