//! `fleetup --list-releases`

use tracing::info;

use fleetup_rollout::ReleaseCatalog;

pub fn run(catalog: &ReleaseCatalog) {
    if catalog.is_empty() {
        info!("no releases available for upgrade");
        return;
    }
    info!("available releases:");
    print!("{}", render(catalog));
}

fn render(catalog: &ReleaseCatalog) -> String {
    catalog
        .releases()
        .iter()
        .map(|release| format!(" * {release}\n"))
        .collect()
}
