//! Interactive progress display for an ongoing provisioning operation.
//!
//! One tracker instance observes one deployment. Every call to
//! [`ProvisioningProgressDisplay::report_progress`] is a best-effort probe:
//! remote failures are logged and swallowed so the next tick can retry, and
//! each resource name is reported to the console at most once.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use azd_api::{Deployment, ResourceManager, resource_type_display_name};
use azd_console::{Console, SpinnerStyle};
use azd_types::{DeploymentOperation, ProvisioningState, TargetResource, UxItem};
use azd_util::{env_flag, parse_iso8601_duration, truncate_to_millis, with_link_format};
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

/// Truthy values suppress links in progress output.
const DEMO_MODE_ENV: &str = "AZD_DEMO_MODE";

pub struct ProvisioningProgressDisplay {
    /// Whether the deployment has started
    deployment_started: bool,
    /// Resource names already reported
    displayed_resources: HashSet<String>,
    demo_mode: bool,
    resource_manager: Arc<dyn ResourceManager>,
    console: Arc<dyn Console>,
    deployment: Arc<dyn Deployment>,
}

impl ProvisioningProgressDisplay {
    pub fn new(
        resource_manager: Arc<dyn ResourceManager>,
        console: Arc<dyn Console>,
        deployment: Arc<dyn Deployment>,
    ) -> Self {
        Self {
            deployment_started: false,
            displayed_resources: HashSet::new(),
            demo_mode: env_flag(DEMO_MODE_ENV),
            resource_manager,
            console,
            deployment,
        }
    }

    /// Override the env-derived demo mode.
    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    /// Report the current deployment progress, emitting newly settled
    /// resources and refreshing the in-progress spinner.
    ///
    /// `query_start` bounds the operations query to changes at or after that
    /// instant. A failure to fetch the deployment before it has been seen
    /// once, or to list its operations, is logged and reported as success;
    /// the caller retries on its next tick.
    pub async fn report_progress(&mut self, query_start: Option<DateTime<Utc>>) -> Result<()> {
        if !self.deployment_started {
            if let Err(error) = self.deployment.get().await {
                warn!("error while reporting progress: {error:#}");
                return Ok(());
            }
            self.deployment_started = true;

            let deployment_url = self.deployment.deployment_url().await?;
            let lines = if self.demo_mode {
                vec![
                    "You can view detailed progress in the Azure Portal.".to_string(),
                    "\n".to_string(),
                ]
            } else {
                vec![
                    "You can view detailed progress in the Azure Portal:".to_string(),
                    format!("{}\n", with_link_format(&deployment_url)),
                ]
            };
            self.console.emit(UxItem::MultilineMessage { lines });
        }

        let operations = match self
            .resource_manager
            .deployment_operations(self.deployment.as_ref(), query_start)
            .await
        {
            Ok(operations) => operations,
            Err(error) => {
                // Status display is a best-effort activity.
                warn!("failed to query deployment operations: {error:#}");
                return Ok(());
            }
        };

        let mut newly_deployed = Vec::new();
        let mut in_progress = Vec::new();
        let mut newly_failed = Vec::new();

        for operation in &operations {
            let Some(target) = operation.target_resource.as_ref() else {
                continue;
            };
            if self.displayed_resources.contains(&target.resource_name) {
                continue;
            }
            match operation.provisioning_state {
                ProvisioningState::Succeeded => newly_deployed.push((operation, target)),
                ProvisioningState::Running => in_progress.push((operation, target)),
                ProvisioningState::Failed => newly_failed.push((operation, target)),
                _ => {}
            }
        }

        // Stable sort: equal timestamps keep their arrival order.
        newly_deployed.sort_by_key(|(operation, _)| operation.timestamp);

        let settled: Vec<_> = newly_deployed.into_iter().chain(newly_failed).collect();
        self.log_newly_created_resources(&settled, &in_progress).await;
        Ok(())
    }

    async fn log_newly_created_resources(
        &mut self,
        resources: &[(&DeploymentOperation, &TargetResource)],
        in_progress: &[(&DeploymentOperation, &TargetResource)],
    ) {
        for (operation, target) in resources {
            let display_name = self.display_name_for(target).await;
            let mut logged_type = target.resource_type.clone();

            // Resources without any display-name translation get no
            // structured row, only the log line.
            if !display_name.is_empty() {
                let duration = parse_iso8601_duration(&operation.duration)
                    .map(truncate_to_millis)
                    .unwrap_or_default();
                self.console.emit(UxItem::DisplayedResource {
                    r#type: display_name.clone(),
                    name: target.resource_name.clone(),
                    state: operation.provisioning_state.clone(),
                    duration,
                });
                logged_type = display_name;
            }

            info!(
                "{}",
                format_operation_log(
                    operation.timestamp,
                    &operation.provisioning_state,
                    &logged_type,
                    &target.resource_name,
                )
            );

            self.displayed_resources.insert(target.resource_name.clone());
        }

        let mut in_progress_types = Vec::new();
        for (_, target) in in_progress {
            let display_name = self.display_name_for(target).await;
            if !display_name.is_empty() {
                in_progress_types.push(display_name);
            }
        }

        if !self.console.is_spinner_interactive() {
            // Non-interactive consoles would render each spinner update as
            // its own output line.
            return;
        }

        if in_progress_types.is_empty() {
            self.console.show_spinner("Creating/Updating resources", SpinnerStyle::Step);
        } else {
            self.console.show_spinner(
                &format!("Creating/Updating resources ({})", in_progress_types.join(", ")),
                SpinnerStyle::Step,
            );
        }
    }

    /// Dynamic display-name lookup with static-table fallback.
    async fn display_name_for(&self, target: &TargetResource) -> String {
        match self
            .resource_manager
            .resource_type_display_name(self.deployment.subscription_id(), &target.id, &target.resource_type)
            .await
        {
            Ok(display_name) => display_name,
            Err(error) => {
                warn!("dynamic resource type translation failed: {error:#}");
                resource_type_display_name(&target.resource_type)
                    .unwrap_or_default()
                    .to_string()
            }
        }
    }
}

/// Line-oriented log record for telemetry, timestamp rendered in local time.
fn format_operation_log(
    timestamp: DateTime<Utc>,
    state: &ProvisioningState,
    type_display: &str,
    resource_name: &str,
) -> String {
    format!(
        "{} - {} {}: {}",
        timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        state,
        type_display,
        resource_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use azd_api::DeploymentSummary;
    use azd_console::mock::MockConsole;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockDeployment {
        get_results: Mutex<VecDeque<Result<DeploymentSummary>>>,
        url: Result<String>,
    }

    impl MockDeployment {
        fn started() -> Self {
            Self::with_gets(vec![Ok(summary(ProvisioningState::Running))])
        }

        fn with_gets(results: Vec<Result<DeploymentSummary>>) -> Self {
            Self {
                get_results: Mutex::new(results.into()),
                url: Ok("https://portal.azure.com/#view/HubsExtension/DeploymentDetailsBlade/~/overview/id/x".into()),
            }
        }
    }

    fn summary(state: ProvisioningState) -> DeploymentSummary {
        DeploymentSummary {
            name: "env-deploy".into(),
            provisioning_state: state,
        }
    }

    #[async_trait]
    impl Deployment for MockDeployment {
        async fn get(&self) -> Result<DeploymentSummary> {
            let mut results = self.get_results.lock().unwrap();
            match results.pop_front() {
                Some(result) => result,
                None => Ok(summary(ProvisioningState::Running)),
            }
        }

        async fn deployment_url(&self) -> Result<String> {
            match &self.url {
                Ok(url) => Ok(url.clone()),
                Err(error) => Err(anyhow!("{error:#}")),
            }
        }

        fn subscription_id(&self) -> &str {
            "sub-1"
        }

        fn id(&self) -> String {
            "/subscriptions/sub-1/resourcegroups/rg/providers/Microsoft.Resources/deployments/env-deploy".into()
        }
    }

    struct MockResourceManager {
        operations: Mutex<VecDeque<Result<Vec<DeploymentOperation>>>>,
        /// Dynamic lookups fail when `None`, forcing the static fallback.
        dynamic_names: Option<fn(&str) -> String>,
    }

    impl MockResourceManager {
        fn with_operations(batches: Vec<Result<Vec<DeploymentOperation>>>) -> Self {
            Self {
                operations: Mutex::new(batches.into()),
                dynamic_names: None,
            }
        }
    }

    #[async_trait]
    impl ResourceManager for MockResourceManager {
        async fn deployment_operations(
            &self,
            _deployment: &dyn Deployment,
            _since: Option<DateTime<Utc>>,
        ) -> Result<Vec<DeploymentOperation>> {
            let mut batches = self.operations.lock().unwrap();
            match batches.pop_front() {
                Some(batch) => batch,
                None => Ok(Vec::new()),
            }
        }

        async fn resource_type_display_name(
            &self,
            _subscription_id: &str,
            _resource_id: &str,
            resource_type: &str,
        ) -> Result<String> {
            match self.dynamic_names {
                Some(lookup) => Ok(lookup(resource_type)),
                None => Err(anyhow!("dynamic lookup unavailable")),
            }
        }
    }

    fn ts(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, seconds).unwrap()
    }

    fn operation(name: &str, state: ProvisioningState, timestamp: DateTime<Utc>) -> DeploymentOperation {
        DeploymentOperation::for_resource(
            format!("/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/{name}"),
            name,
            "Microsoft.KeyVault/vaults",
            state,
            timestamp,
        )
    }

    fn display(
        resource_manager: MockResourceManager,
        console: Arc<MockConsole>,
        deployment: MockDeployment,
    ) -> ProvisioningProgressDisplay {
        ProvisioningProgressDisplay::new(Arc::new(resource_manager), console, Arc::new(deployment))
            .with_demo_mode(false)
    }

    fn emitted_resource_names(console: &MockConsole) -> Vec<String> {
        console
            .items()
            .into_iter()
            .filter_map(|item| match item {
                UxItem::DisplayedResource { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn first_call_announces_the_portal_url() {
        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");

        let items = console.items();
        assert_eq!(items.len(), 1);
        match &items[0] {
            UxItem::MultilineMessage { lines } => {
                assert!(lines[0].contains("You can view detailed progress in the Azure Portal:"));
                assert!(lines[1].contains("portal.azure.com"));
            }
            other => panic!("expected an announcement, got {other:?}"),
        }

        // Second tick does not announce again.
        display.report_progress(None).await.expect("report");
        assert_eq!(console.items().len(), 1);
    }

    #[tokio::test]
    async fn demo_mode_suppresses_the_link() {
        let console = Arc::new(MockConsole::new());
        let mut display = ProvisioningProgressDisplay::new(
            Arc::new(MockResourceManager::with_operations(vec![])),
            Arc::clone(&console) as Arc<dyn Console>,
            Arc::new(MockDeployment::started()),
        )
        .with_demo_mode(true);

        display.report_progress(None).await.expect("report");

        match &console.items()[0] {
            UxItem::MultilineMessage { lines } => {
                assert!(lines[0].ends_with("Azure Portal."));
                assert!(lines.iter().all(|line| !line.contains("portal.azure.com")));
            }
            other => panic!("expected an announcement, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_failure_before_start_is_soft() {
        let console = Arc::new(MockConsole::new());
        let deployment = MockDeployment::with_gets(vec![
            Err(anyhow!("deployment not found")),
            Ok(summary(ProvisioningState::Running)),
        ]);
        let mut display = display(MockResourceManager::with_operations(vec![]), Arc::clone(&console), deployment);

        display.report_progress(None).await.expect("soft failure");
        assert!(console.items().is_empty());

        display.report_progress(None).await.expect("report");
        assert_eq!(console.items().len(), 1, "announcement after retry");
    }

    #[tokio::test]
    async fn operations_query_failure_is_soft() {
        let console = Arc::new(MockConsole::new());
        let resource_manager = MockResourceManager::with_operations(vec![
            Err(anyhow!("throttled")),
            Ok(vec![operation("kv", ProvisioningState::Succeeded, ts(1))]),
        ]);
        let mut display = display(resource_manager, Arc::clone(&console), MockDeployment::started());

        display.report_progress(None).await.expect("soft failure");
        assert_eq!(emitted_resource_names(&console), Vec::<String>::new());

        display.report_progress(None).await.expect("report");
        assert_eq!(emitted_resource_names(&console), vec!["kv"]);
    }

    #[tokio::test]
    async fn succeeded_resources_emit_in_timestamp_order_exactly_once() {
        let batch = vec![
            operation("third", ProvisioningState::Succeeded, ts(3)),
            operation("first", ProvisioningState::Succeeded, ts(1)),
            operation("second", ProvisioningState::Succeeded, ts(2)),
        ];
        let console = Arc::new(MockConsole::new());
        let resource_manager =
            MockResourceManager::with_operations(vec![Ok(batch.clone()), Ok(batch)]);
        let mut display = display(resource_manager, Arc::clone(&console), MockDeployment::started());

        display.report_progress(None).await.expect("report");
        assert_eq!(emitted_resource_names(&console), vec!["first", "second", "third"]);

        // The same operations on the next tick produce no new emissions.
        display.report_progress(None).await.expect("report");
        assert_eq!(emitted_resource_names(&console), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failed_resources_emit_after_succeeded_ones() {
        let batch = vec![
            operation("broken", ProvisioningState::Failed, ts(1)),
            operation("ok", ProvisioningState::Succeeded, ts(5)),
        ];
        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(batch)]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");

        // The failed row comes last even though it is older.
        assert_eq!(emitted_resource_names(&console), vec!["ok", "broken"]);
    }

    #[tokio::test]
    async fn operations_without_a_target_resource_are_ignored() {
        let mut bare = operation("ignored", ProvisioningState::Succeeded, ts(1));
        bare.target_resource = None;
        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(vec![bare])]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");
        assert!(emitted_resource_names(&console).is_empty());
    }

    #[tokio::test]
    async fn untranslatable_types_skip_the_row_but_still_dedupe() {
        let mut unknown = operation("mystery", ProvisioningState::Succeeded, ts(1));
        if let Some(target) = unknown.target_resource.as_mut() {
            target.resource_type = "Contoso.Widgets/frobnicators".into();
        }
        let console = Arc::new(MockConsole::new());
        let resource_manager =
            MockResourceManager::with_operations(vec![Ok(vec![unknown.clone()]), Ok(vec![unknown])]);
        let mut display = display(resource_manager, Arc::clone(&console), MockDeployment::started());

        display.report_progress(None).await.expect("report");
        assert!(emitted_resource_names(&console).is_empty());

        // Dedup applies to the second tick even though nothing was rendered.
        display.report_progress(None).await.expect("report");
        assert!(emitted_resource_names(&console).is_empty());
    }

    #[tokio::test]
    async fn dynamic_display_names_win_over_the_static_table() {
        let mut resource_manager =
            MockResourceManager::with_operations(vec![Ok(vec![operation("kv", ProvisioningState::Succeeded, ts(1))])]);
        resource_manager.dynamic_names = Some(|_| "Live Name".to_string());
        let console = Arc::new(MockConsole::new());
        let mut display = display(resource_manager, Arc::clone(&console), MockDeployment::started());

        display.report_progress(None).await.expect("report");

        let types: Vec<String> = console
            .items()
            .into_iter()
            .filter_map(|item| match item {
                UxItem::DisplayedResource { r#type, .. } => Some(r#type),
                _ => None,
            })
            .collect();
        assert_eq!(types, vec!["Live Name"]);
    }

    #[tokio::test]
    async fn spinner_lists_in_progress_types_in_encounter_order() {
        let batch = vec![
            operation("kv", ProvisioningState::Running, ts(1)),
            operation("kv2", ProvisioningState::Running, ts(2)),
        ];
        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(batch)]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");

        let spinners = console.spinner_messages();
        // The list is not deduplicated: two vaults mean the type twice.
        assert_eq!(spinners.last().map(String::as_str), Some("Creating/Updating resources (Key Vault, Key Vault)"));
    }

    #[tokio::test]
    async fn spinner_without_in_progress_resources_is_generic() {
        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(vec![])]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");
        assert_eq!(console.spinner_messages().last().map(String::as_str), Some("Creating/Updating resources"));
    }

    #[tokio::test]
    async fn non_interactive_consoles_get_no_spinner() {
        let console = Arc::new(MockConsole::non_interactive());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(vec![operation(
                "kv",
                ProvisioningState::Running,
                ts(1),
            )])]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");
        assert!(console.spinner_messages().is_empty());
    }

    #[tokio::test]
    async fn durations_truncate_to_milliseconds_and_default_to_zero() {
        let mut timed = operation("kv", ProvisioningState::Succeeded, ts(1));
        timed.duration = "PT1.2345678S".into();
        let mut untimed = operation("kv2", ProvisioningState::Succeeded, ts(2));
        untimed.duration = "garbage".into();

        let console = Arc::new(MockConsole::new());
        let mut display = display(
            MockResourceManager::with_operations(vec![Ok(vec![timed, untimed])]),
            Arc::clone(&console),
            MockDeployment::started(),
        );

        display.report_progress(None).await.expect("report");

        let durations: Vec<std::time::Duration> = console
            .items()
            .into_iter()
            .filter_map(|item| match item {
                UxItem::DisplayedResource { duration, .. } => Some(duration),
                _ => None,
            })
            .collect();
        assert_eq!(durations, vec![std::time::Duration::from_millis(1_234), std::time::Duration::ZERO]);
    }

    #[test]
    fn demo_mode_defaults_from_the_environment() {
        unsafe { std::env::set_var(DEMO_MODE_ENV, "1") };
        let display = ProvisioningProgressDisplay::new(
            Arc::new(MockResourceManager::with_operations(vec![])),
            Arc::new(MockConsole::new()),
            Arc::new(MockDeployment::started()),
        );
        unsafe { std::env::remove_var(DEMO_MODE_ENV) };
        assert!(display.demo_mode);
    }

    #[test]
    fn operation_log_format_is_line_oriented() {
        let line = format_operation_log(ts(30), &ProvisioningState::Succeeded, "Key Vault", "kv-prod");
        // Local-time rendering: check the stable parts of the shape.
        assert!(line.contains(" - Succeeded Key Vault: kv-prod"));
        let timestamp_part = line.split(" - ").next().expect("timestamp prefix");
        assert_eq!(timestamp_part.len(), "2025-06-01 12:00:30".len());
    }
}
