use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stateset_bom::{
    bom::{
        behavior::CategoryBehavior,
        gateway::{BomGateway, HttpBomGateway},
        session::{BomWizardSession, WizardSettings},
        size_matrix::{Completion, SizeMatrixRowFilter},
        types::{CategoryId, ColorId, MaterialId, ProductId},
        BomAssembly,
    },
    config::{self, AppConfig},
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    let context = CliContext::initialize(&cli, &cfg)?;

    match cli.command {
        Commands::Status(args) => handle_status(&context, args, cli.json).await?,
        Commands::Show(args) => handle_show(&context, args, cli.json).await?,
        Commands::Apply(args) => handle_apply(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "bom-wizard",
    about = "Configure the bill of materials of a product variant by variant",
    version
)]
struct Cli {
    #[arg(long, global = true, help = "Base URL of the BOM API, e.g. http://localhost:8080/api/v1")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "User recorded on saved rows")]
    user: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Rows of the size matrix: color_variable or size_variable"
    )]
    rows: Option<SizeMatrixRowFilter>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Whether the product already has a BOM
    Status(ProductArgs),
    /// Current registries, matrix completion and assembled lines
    Show(ProductArgs),
    /// Apply a plan file to the wizard, save step 1 and optionally finalize
    Apply(ApplyArgs),
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long)]
    product: ProductId,
}

#[derive(Args)]
struct ApplyArgs {
    #[arg(long)]
    product: ProductId,
    #[arg(long, help = "JSON plan describing the three wizard steps")]
    plan: PathBuf,
    #[arg(long, action = ArgAction::SetTrue, help = "Persist the whole BOM after applying")]
    finalize: bool,
}

/// Wizard input read from a plan file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WizardPlan {
    #[serde(default)]
    common: Vec<PlanCommonMaterial>,
    #[serde(default)]
    colors: Vec<PlanColorMaterial>,
    #[serde(default)]
    base_quantities: Vec<PlanBaseQuantity>,
    #[serde(default)]
    sizes: PlanSizes,
}

#[derive(Debug, Deserialize)]
struct PlanCommonMaterial {
    category_id: CategoryId,
    material_id: MaterialId,
    #[serde(default)]
    quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct PlanColorMaterial {
    category_id: CategoryId,
    color_id: ColorId,
    material_id: MaterialId,
}

#[derive(Debug, Deserialize)]
struct PlanBaseQuantity {
    category_id: CategoryId,
    quantity: Decimal,
}

#[derive(Debug, Default, Deserialize)]
struct PlanSizes {
    #[serde(default)]
    fill_all: Option<Decimal>,
    #[serde(default)]
    pattern: Option<PlanPattern>,
    #[serde(default)]
    cells: Vec<PlanCell>,
}

#[derive(Debug, Deserialize)]
struct PlanPattern {
    base: Decimal,
    increment: Decimal,
}

#[derive(Debug, Deserialize)]
struct PlanCell {
    category_id: CategoryId,
    size_label: String,
    quantity: Decimal,
}

struct CliContext {
    gateway: Arc<dyn BomGateway>,
    settings: WizardSettings,
}

impl CliContext {
    fn initialize(cli: &Cli, cfg: &AppConfig) -> Result<Self> {
        let base_url = cli
            .api_url
            .clone()
            .unwrap_or_else(|| cfg.backend.base_url.clone());
        let gateway = HttpBomGateway::new(base_url, Duration::from_secs(cfg.backend.timeout_secs))
            .context("failed to build HTTP client")?;
        debug!(base_url = gateway.base_url(), "using BOM API");

        let user = cli
            .user
            .clone()
            .or_else(|| cfg.wizard.default_user.clone())
            .ok_or_else(|| anyhow!("no user given: pass --user or set APP__WIZARD__DEFAULT_USER"))?;
        let settings = WizardSettings::new(user)
            .with_row_filter(cli.rows.unwrap_or(cfg.wizard.size_matrix_rows));

        Ok(Self {
            gateway: Arc::new(gateway),
            settings,
        })
    }

    async fn open(&self, product_id: ProductId) -> Result<BomWizardSession> {
        BomWizardSession::open(self.gateway.clone(), product_id, self.settings.clone())
            .await
            .with_context(|| format!("failed to open wizard for product {}", product_id))
    }
}

async fn handle_status(context: &CliContext, args: ProductArgs, json: bool) -> Result<()> {
    let has_bom = context
        .gateway
        .has_bom(args.product)
        .await
        .context("failed to query BOM status")?;
    if json {
        print_json(&serde_json::json!({ "product_id": args.product, "has_bom": has_bom }))?;
    } else if has_bom {
        println!("Product {} has a bill of materials", args.product);
    } else {
        println!("Product {} has no bill of materials yet", args.product);
    }
    Ok(())
}

#[derive(Serialize)]
struct CategorySummary {
    id: CategoryId,
    name: String,
    behavior: CategoryBehavior,
}

#[derive(Serialize)]
struct SessionSummary {
    product_id: ProductId,
    product_name: String,
    sizes: Vec<String>,
    categories: Vec<CategorySummary>,
    common_materials: usize,
    color_assignments: usize,
    matrix_rows: Vec<CategoryId>,
    completion: Completion,
    assembly: BomAssembly,
}

fn summarize(session: &BomWizardSession) -> SessionSummary {
    let categories = session
        .categories()
        .into_iter()
        .map(|c| CategorySummary {
            id: c.id,
            name: c.name.clone(),
            behavior: stateset_bom::bom::behavior::resolve(c),
        })
        .collect();
    SessionSummary {
        product_id: session.product_id(),
        product_name: session.product().product.name.clone(),
        sizes: session.sizes().columns().to_vec(),
        categories,
        common_materials: session.common().len(),
        color_assignments: session.colors().len(),
        matrix_rows: session.sizes().rows().to_vec(),
        completion: session.completion(),
        assembly: session.assemble(),
    }
}

fn render_summary(summary: &SessionSummary) {
    println!(
        "Product {} • {} • sizes {}",
        summary.product_id,
        summary.product_name,
        summary.sizes.join(", ")
    );
    for category in &summary.categories {
        println!(
            "- Category {} {} • {} / {}",
            category.id, category.name, category.behavior.mode, category.behavior.quantity
        );
    }
    println!(
        "Common materials: {} • color assignments: {} • size matrix {}/{} ({}%)",
        summary.common_materials,
        summary.color_assignments,
        summary.completion.filled,
        summary.completion.total,
        summary.completion.percent()
    );
    for line in &summary.assembly.lines {
        println!(
            "  {} / {} • category {} • material {} • qty {} (gross {}) unit {}",
            line.size_label,
            line.color_label,
            line.category_id,
            line.material_id,
            line.quantity,
            line.gross_quantity,
            line.unit_id
        );
    }
    if !summary.assembly.is_complete() {
        println!("Missing assignments:");
        for missing in &summary.assembly.missing {
            println!("  {}", missing);
        }
    }
}

async fn handle_show(context: &CliContext, args: ProductArgs, json: bool) -> Result<()> {
    let session = context.open(args.product).await?;
    let summary = summarize(&session);
    if json {
        print_json(&summary)?;
    } else {
        render_summary(&summary);
    }
    Ok(())
}

fn read_plan(path: &PathBuf) -> Result<WizardPlan> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid plan {}", path.display()))
}

fn apply_plan(session: &mut BomWizardSession, plan: &WizardPlan) -> Result<()> {
    for item in &plan.common {
        if session.common().contains_material(item.material_id) {
            debug!(material_id = item.material_id, "common material already present");
            continue;
        }
        session
            .add_common_material(Some(item.category_id), Some(item.material_id), item.quantity)
            .with_context(|| format!("common material {}", item.material_id))?;
    }
    for item in &plan.colors {
        session
            .assign_color_material(item.category_id, item.color_id, item.material_id)
            .with_context(|| {
                format!(
                    "color material for category {} color {}",
                    item.category_id, item.color_id
                )
            })?;
    }
    for item in &plan.base_quantities {
        session
            .set_color_base_quantity(item.category_id, item.quantity)
            .with_context(|| format!("base quantity for category {}", item.category_id))?;
    }

    let sizes = session.sizes_mut();
    if let Some(value) = plan.sizes.fill_all {
        sizes.fill_all(value).context("fill_all")?;
    }
    if let Some(pattern) = &plan.sizes.pattern {
        sizes
            .apply_incremental_pattern(pattern.base, pattern.increment)
            .context("incremental pattern")?;
    }
    for cell in &plan.sizes.cells {
        sizes
            .set_cell(cell.category_id, &cell.size_label, cell.quantity)
            .with_context(|| format!("size {} of category {}", cell.size_label, cell.category_id))?;
    }
    Ok(())
}

async fn handle_apply(context: &CliContext, args: ApplyArgs, json: bool) -> Result<()> {
    let plan = read_plan(&args.plan)?;
    let mut session = context.open(args.product).await?;
    apply_plan(&mut session, &plan)?;

    let saved = session
        .save_common_materials()
        .await
        .context("failed to save common materials")?;
    if !json {
        println!("Saved {} common materials", saved);
    }

    if args.finalize {
        let outcome = session.finalize().await.context("failed to finalize BOM")?;
        if json {
            print_json(&outcome.response)?;
        } else {
            println!(
                "BOM finalized for product {}: {} common, {} color, {} size rows, {} lines",
                outcome.response.product_id,
                outcome.response.common_materials,
                outcome.response.variation_materials,
                outcome.response.size_consumptions,
                outcome.assembly.lines.len()
            );
            if !outcome.reloaded {
                println!("Warning: the BOM was saved but could not be reloaded; run `status` to check it");
            }
        }
    } else {
        let summary = summarize(&session);
        if json {
            print_json(&summary)?;
        } else {
            render_summary(&summary);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_parses_with_defaults() {
        let plan: WizardPlan = serde_json::from_str(
            r#"{
                "common": [{"category_id": 1, "material_id": 3, "quantity": "1"}],
                "colors": [{"category_id": 2, "color_id": 1, "material_id": 5}],
                "sizes": {"pattern": {"base": 2, "increment": "1"}}
            }"#,
        )
        .unwrap();
        assert_eq!(plan.common.len(), 1);
        assert_eq!(plan.colors[0].material_id, 5);
        assert!(plan.base_quantities.is_empty());
        assert!(plan.sizes.fill_all.is_none());
        assert_eq!(plan.sizes.pattern.unwrap().increment, Decimal::ONE);
    }

    #[test]
    fn plan_rejects_unknown_fields() {
        assert!(serde_json::from_str::<WizardPlan>(r#"{"steps": []}"#).is_err());
    }

    #[test]
    fn cli_parses_apply() {
        let cli = Cli::try_parse_from([
            "bom-wizard",
            "--user",
            "planner",
            "--rows",
            "size_variable",
            "apply",
            "--product",
            "7",
            "--plan",
            "plan.json",
            "--finalize",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("planner"));
        assert_eq!(cli.rows, Some(SizeMatrixRowFilter::SizeVariable));
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.product, 7);
                assert!(args.finalize);
            }
            _ => panic!("expected apply"),
        }
    }
}
