//! Cluster command handlers.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tabled::Tabled;

use kubecloud_core::validation::{FieldValidation, Rules};
use kubecloud_core::{
    App, Cluster, ClusterMetrics, ClusterStatus, ClusterUpdate, CreateClusterRequest,
    NotificationOptions, with_retry,
};

use crate::cli::{ClustersArgs, ClustersCommand, GlobalOpts, StatusFilter};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Nodes")]
    nodes: u32,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&Arc<Cluster>> for ClusterRow {
    fn from(c: &Arc<Cluster>) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            status: c.status.to_string(),
            region: c.region.clone(),
            nodes: c.nodes,
            cpu: c.cpu.clone(),
            memory: c.memory.clone(),
            cost: format!("${:.2}", c.cost),
            tags: c.tags.join(", "),
        }
    }
}

fn detail(c: &Arc<Cluster>, color: bool) -> String {
    output::detail_block(&[
        ("ID", c.id.clone()),
        ("Name", c.name.clone()),
        ("Status", output::paint_status(c.status, color)),
        ("Region", c.region.clone()),
        ("Nodes", c.nodes.to_string()),
        ("CPU", c.cpu.clone()),
        ("Memory", c.memory.clone()),
        ("Storage", c.storage.clone()),
        ("Cost", format!("${:.2}", c.cost)),
        ("Tags", c.tags.join(", ")),
        ("Created", c.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
        ("Updated", c.last_updated.format("%Y-%m-%d %H:%M UTC").to_string()),
    ])
}

fn metrics_detail(m: &ClusterMetrics) -> String {
    output::detail_block(&[
        ("CPU", format!("{:.1}%", m.cpu_usage)),
        ("Memory", format!("{:.1}%", m.memory_usage)),
        ("Storage", format!("{:.1}%", m.storage_usage)),
        ("Network in", format!("{:.1} Mbps", m.network_in)),
        ("Network out", format!("{:.1} Mbps", m.network_out)),
        ("Connections", m.active_connections.to_string()),
    ])
}

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    total: usize,
    running: usize,
    stopped: usize,
    total_cost: f64,
    by_region: IndexMap<String, Vec<String>>,
}

impl Summary {
    fn collect(app: &App) -> Self {
        let clusters = app.clusters();
        Self {
            total: clusters.clusters().len(),
            running: clusters.running_clusters().len(),
            stopped: clusters.stopped_clusters().len(),
            total_cost: clusters.total_cost(),
            by_region: clusters
                .clusters_by_region()
                .into_iter()
                .map(|(region, members)| {
                    (region, members.iter().map(|c| c.id.clone()).collect())
                })
                .collect(),
        }
    }

    fn detail(&self) -> String {
        let mut pairs = vec![
            ("Clusters", self.total.to_string()),
            ("Running", self.running.to_string()),
            ("Stopped", self.stopped.to_string()),
            ("Total cost", format!("${:.2}", self.total_cost)),
        ];
        pairs.extend(
            self.by_region
                .iter()
                .map(|(region, ids)| (region.as_str(), ids.join(", "))),
        );
        output::detail_block(&pairs)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn status_of(filter: StatusFilter) -> ClusterStatus {
    match filter {
        StatusFilter::Running => ClusterStatus::Running,
        StatusFilter::Stopped => ClusterStatus::Stopped,
        StatusFilter::Starting => ClusterStatus::Starting,
        StatusFilter::Stopping => ClusterStatus::Stopping,
        StatusFilter::Error => ClusterStatus::Error,
    }
}

fn validate_create(request: &CreateClusterRequest) -> Result<(), CliError> {
    let mut form = IndexMap::new();
    form.insert(
        "name".to_owned(),
        FieldValidation::new(
            request.name.as_str(),
            Rules::new().required().min_length(3).max_length(50),
        )
        .named("Name"),
    );
    form.insert(
        "region".to_owned(),
        FieldValidation::new(request.region.as_str(), Rules::preset_required()).named("Region"),
    );
    form.insert(
        "nodes".to_owned(),
        FieldValidation::new(request.nodes, Rules::new().required().min(1.0).max(100.0))
            .named("Nodes"),
    );
    util::check_form(&form)
}

fn print_cluster(cluster: &Arc<Cluster>, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        cluster,
        |c| detail(c, color),
        |c| c.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    app: &App,
    args: ClustersArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let store = app.clusters();
    let notes = app.notifications();

    match args.command {
        ClustersCommand::List { status, region } => {
            let all = with_retry(util::read_policy(global), || store.fetch_clusters()).await?;
            let wanted = status.map(status_of);
            let snap: Vec<Arc<Cluster>> = all
                .iter()
                .filter(|c| wanted.is_none_or(|s| c.status == s))
                .filter(|c| region.as_deref().is_none_or(|r| c.region == r))
                .cloned()
                .collect();
            let out = output::render_list(
                global.output,
                &snap,
                |c| ClusterRow::from(c),
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClustersCommand::Get { id } => {
            util::ensure_clusters(app, global).await?;
            store.select_cluster(Some(id.as_str()))?;
            let cluster = store.selected_cluster().ok_or_else(|| CliError::NotFound {
                resource_type: "cluster".into(),
                identifier: id.clone(),
                list_command: "clusters list".into(),
            })?;
            print_cluster(&cluster, global, color)
        }

        ClustersCommand::Create {
            name,
            region,
            nodes,
            node_type,
            tags,
            wait,
        } => {
            let request = CreateClusterRequest {
                name: kubecloud_core::validation::sanitize_input(&name),
                region: kubecloud_core::validation::sanitize_input(&region),
                nodes,
                node_type,
                tags,
            };
            validate_create(&request)?;

            let created = store.create_cluster(&request).await?;
            notes.success(
                "Cluster created",
                format!("{} ({})", created.name, created.id),
                NotificationOptions::default(),
            );
            let cluster = if wait.wait {
                util::wait_for_status(app, &created.id, ClusterStatus::Running, wait, global.quiet)
                    .await?
            } else {
                created
            };
            print_cluster(&cluster, global, color)
        }

        ClustersCommand::Delete { id } => {
            util::ensure_clusters(app, global).await?;
            if store.get(&id).is_none() {
                return Err(CliError::NotFound {
                    resource_type: "cluster".into(),
                    identifier: id,
                    list_command: "clusters list".into(),
                });
            }
            if !util::confirm(
                &format!("Delete cluster '{id}'? This is destructive."),
                "clusters delete",
                global.yes,
            )? {
                return Ok(());
            }
            store.delete_cluster(&id).await?;
            notes.success("Cluster deleted", id, NotificationOptions::default());
            Ok(())
        }

        ClustersCommand::Start { id, wait } => {
            util::ensure_clusters(app, global).await?;
            let mut cluster = store.start_cluster(&id).await?;
            notes.info("Cluster starting", id.clone(), NotificationOptions::default());
            if wait.wait {
                cluster =
                    util::wait_for_status(app, &id, ClusterStatus::Running, wait, global.quiet)
                        .await?;
            }
            print_cluster(&cluster, global, color)
        }

        ClustersCommand::Stop { id, wait } => {
            util::ensure_clusters(app, global).await?;
            let mut cluster = store.stop_cluster(&id).await?;
            notes.info("Cluster stopping", id.clone(), NotificationOptions::default());
            if wait.wait {
                cluster =
                    util::wait_for_status(app, &id, ClusterStatus::Stopped, wait, global.quiet)
                        .await?;
            }
            print_cluster(&cluster, global, color)
        }

        ClustersCommand::Update {
            id,
            name,
            region,
            nodes,
            tags,
        } => {
            let update = ClusterUpdate {
                name: name.map(|n| kubecloud_core::validation::sanitize_input(&n)),
                region,
                nodes,
                tags: (!tags.is_empty()).then_some(tags),
                ..ClusterUpdate::default()
            };
            if update.is_empty() {
                return Err(CliError::Validation {
                    reason: "nothing to update; pass at least one of --name, --region, --nodes, --tag"
                        .into(),
                });
            }
            util::ensure_clusters(app, global).await?;
            let cluster = store.update_cluster(&id, &update).await?;
            notes.success("Cluster updated", id, NotificationOptions::default());
            print_cluster(&cluster, global, color)
        }

        ClustersCommand::Metrics { id } => {
            util::ensure_clusters(app, global).await?;
            let metrics = store.cluster_metrics(&id).await?;
            let out = output::render_single(global.output, &metrics, metrics_detail, |_| id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClustersCommand::Summary => {
            with_retry(util::read_policy(global), || store.fetch_clusters()).await?;
            let summary = Summary::collect(app);
            let out = output::render_single(
                global.output,
                &summary,
                Summary::detail,
                |s| format!("{} {} {}", s.running, s.stopped, s.total_cost),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
