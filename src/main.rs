// ==========================================
// SysPro 排产看板 - 命令行入口
// ==========================================
// 职责: 解析命令行参数，调用 API 层，输出文本或 JSON
// ==========================================

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use syspro_planner::api::ReconciliationSummary;
use syspro_planner::app::{get_default_db_path, AppState, DB_PATH_ENV};
use syspro_planner::domain::{
    FilterOptions, LoadBatch, Order, OrderEdit, OrderFilter, OrderImportReport, StockImportReport,
};
use syspro_planner::logging;

#[derive(Parser)]
#[command(name = "syspro")]
#[command(about = "SysPro 订单/库存看板：导入、对账、编辑与导出", version)]
struct Cli {
    /// SQLite 数据库路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 执行结构迁移与历史列规范化
    Migrate,

    /// 导入订单表格（.xlsx/.xls/.ods/.csv）
    ImportOrders {
        file: PathBuf,
        #[arg(long)]
        operator: Option<String>,
    },

    /// 导入 ERP 抽取库（SQLite）中的订单表
    ImportExtract {
        file: PathBuf,
        /// 抽取库中的表名
        #[arg(long, default_value = "Pedidos")]
        table: String,
        #[arg(long)]
        operator: Option<String>,
    },

    /// 导入库存表格（整表替换）
    ImportStock { file: PathBuf },

    /// 扫描邮箱导出文件中的新订单号并写 ERP 交接文件
    ScanMail {
        mailbox: PathBuf,
        /// 覆盖配置中的交接文件路径
        #[arg(long)]
        handoff: Option<PathBuf>,
        /// 基准时间（YYYY-MM-DD HH:MM:SS），默认当前时间
        #[arg(long)]
        now: Option<String>,
    },

    /// 查看订单（可按订单号搜索或按看板条件筛选）
    Orders {
        #[arg(long)]
        search: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// 查看某一导入批次的订单
    Load { id: i64 },

    /// 最近的导入批次
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// 编辑订单单元格
    Edit(EditArgs),

    /// 按 (厚, 宽, 长, 等级) 对账订单与库存
    Reconcile {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// 级联筛选可选项
    Filters {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// 导出 Pedidos / StockBlanks 为 CSV
    Export {
        /// 导出目录，默认读配置 export.dir
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// 查看或修改配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Args, Default)]
struct FilterArgs {
    #[arg(long = "machine")]
    machines: Vec<String>,
    #[arg(long = "thickness")]
    thicknesses: Vec<String>,
    #[arg(long = "width")]
    widths: Vec<String>,
    #[arg(long = "length")]
    lengths: Vec<String>,
    #[arg(long = "quality")]
    qualities: Vec<String>,
    /// 订单号子串
    #[arg(long = "ofa")]
    order_number: Option<String>,
}

impl From<FilterArgs> for OrderFilter {
    fn from(args: FilterArgs) -> Self {
        OrderFilter {
            machines: args.machines,
            thicknesses: args.thicknesses,
            widths: args.widths,
            lengths: args.lengths,
            qualities: args.qualities,
            order_number_query: args.order_number,
        }
    }
}

#[derive(Args)]
struct EditArgs {
    /// 批量编辑文件（OrderEdit 的 JSON 数组）
    #[arg(long, conflicts_with = "id")]
    file: Option<PathBuf>,
    /// 订单行 id
    #[arg(long, required_unless_present = "file")]
    id: Option<i64>,
    #[arg(long)]
    machine: Option<String>,
    #[arg(long)]
    sequence: Option<i64>,
    #[arg(long)]
    material: Option<String>,
    #[arg(long)]
    material_text: Option<String>,
    #[arg(long)]
    thickness: Option<String>,
    #[arg(long)]
    width: Option<String>,
    #[arg(long)]
    length: Option<String>,
    #[arg(long)]
    quality: Option<String>,
    #[arg(long)]
    volume: Option<f64>,
}

impl EditArgs {
    fn into_edits(self) -> Result<Vec<OrderEdit>> {
        if let Some(path) = self.file {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("无法读取编辑文件 {}", path.display()))?;
            let edits: Vec<OrderEdit> = serde_json::from_str(&raw)
                .with_context(|| format!("编辑文件格式错误 {}", path.display()))?;
            return Ok(edits);
        }
        let Some(id) = self.id else {
            bail!("需要 --id 或 --file");
        };
        Ok(vec![OrderEdit {
            id,
            machine: self.machine,
            sequence: self.sequence,
            material_code: self.material,
            material_text: self.material_text,
            thickness: self.thickness,
            width: self.width,
            length: self.length,
            quality: self.quality,
            volume_m3: self.volume,
        }])
    }
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path)?;
    let json = cli.json;

    match cli.command {
        Command::Migrate => {
            let report = state.migrate()?;
            emit(json, &report, |r| {
                println!("schema 版本: {}", r.migrations.current_version);
                for m in &r.migrations.applied {
                    println!("  v{} {} {:?}", m.version, m.description, m.changes);
                }
                for c in r.renamed_columns.iter().chain(&r.added_columns) {
                    println!("  {}", c);
                }
            })?;
        }
        Command::ImportOrders { file, operator } => {
            let operator = resolve_operator(operator);
            let report = state.import_api.import_orders(&file, operator.as_deref())?;
            emit(json, &report, print_order_import)?;
        }
        Command::ImportExtract {
            file,
            table,
            operator,
        } => {
            let operator = resolve_operator(operator);
            let report = state
                .import_api
                .import_extract(&file, Some(&table), operator.as_deref())?;
            emit(json, &report, print_order_import)?;
        }
        Command::ImportStock { file } => {
            let report = state.import_api.import_stock(&file)?;
            emit(json, &report, print_stock_import)?;
        }
        Command::ScanMail {
            mailbox,
            handoff,
            now,
        } => {
            let now = match now {
                Some(raw) => NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
                    .with_context(|| format!("无法解析时间: {}", raw))?,
                None => Local::now().naive_local(),
            };
            let result = state
                .import_api
                .scan_mail(&mailbox, now, handoff.as_deref())?;
            emit(json, &result, |r| {
                println!(
                    "扫描 {} 封邮件，新订单号 {} 个 → {}",
                    r.scanned_messages,
                    r.new_order_numbers.len(),
                    r.handoff_file.display()
                );
                for n in &r.new_order_numbers {
                    println!("  {}", n);
                }
            })?;
        }
        Command::Orders { search, filter } => {
            let mut filter = OrderFilter::from(filter);
            let orders = if !filter.is_empty() {
                if filter.order_number_query.is_none() {
                    filter.order_number_query = search;
                }
                state.dashboard_api.filtered_orders(&filter)?
            } else {
                state.order_api.search_orders(search.as_deref().unwrap_or(""))?
            };
            emit(json, &orders, |o| print_orders(o))?;
        }
        Command::Load { id } => {
            let detail = state.order_api.load_detail(id)?;
            emit(json, &detail, |d| {
                print_batches(std::slice::from_ref(&d.batch));
                print_orders(&d.orders);
            })?;
        }
        Command::History { limit } => {
            let batches = state.order_api.load_history(limit)?;
            emit(json, &batches, |b| print_batches(b))?;
        }
        Command::Edit(args) => {
            let updated = state.order_api.edit_orders(args.into_edits()?)?;
            emit(json, &serde_json::json!({ "updated": updated }), |_| {
                println!("已修改 {} 行", updated)
            })?;
        }
        Command::Reconcile { filter } => {
            let summary = state.dashboard_api.reconcile(&filter.into())?;
            emit(json, &summary, print_reconciliation)?;
        }
        Command::Filters { filter } => {
            let options = state.dashboard_api.filter_options(&filter.into())?;
            emit(json, &options, print_filter_options)?;
        }
        Command::Export { dir } => {
            let report = state.dashboard_api.export_tables(dir.as_deref())?;
            emit(json, &report, |r| {
                for f in [&r.orders, &r.stock] {
                    println!("{}: {} 行 → {}", f.table, f.rows, f.path.display());
                }
            })?;
        }
        Command::Config { action } => match action {
            ConfigAction::List => {
                let entries = state.config_api.list_configs()?;
                emit(json, &entries, |es| {
                    for e in es {
                        let mark = if e.is_default { " (默认)" } else { "" };
                        println!("{} = {}{}", e.key, e.value, mark);
                    }
                })?;
            }
            ConfigAction::Get { key } => {
                let entry = state.config_api.get_config(&key)?;
                emit(json, &entry, |e| println!("{}", e.value))?;
            }
            ConfigAction::Set { key, value } => {
                let entry = state.config_api.update_config(&key, &value)?;
                emit(json, &entry, |e| println!("{} = {}", e.key, e.value))?;
            }
        },
    }

    Ok(())
}

/// 操作员：参数优先，其次 USER / USERNAME
fn resolve_operator(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|s| !s.trim().is_empty())
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn opt(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("-")
}

fn print_order_import(r: &OrderImportReport) {
    println!(
        "批次 {} ({}): 共 {} 行，插入 {}，重复 {}，拒绝 {}，耗时 {}ms",
        r.load_id,
        r.source,
        r.total_rows,
        r.inserted,
        r.duplicates.len(),
        r.rejected.len(),
        r.elapsed_ms
    );
    for d in &r.duplicates {
        let kind = if d.in_batch { "同批次" } else { "库中已有" };
        println!("  重复 行{} {} ({})", d.row_number, d.key, kind);
    }
    for x in &r.rejected {
        println!("  拒绝 行{}: {}", x.row_number, x.reason);
    }
    if !r.incomplete.is_empty() {
        println!("  属性补全失败 {} 行:", r.incomplete.len());
        for i in &r.incomplete {
            println!(
                "    {}/{} TEMPLATE={} Materia={}",
                opt(&i.order_number),
                opt(&i.position),
                opt(&i.template),
                opt(&i.material_code)
            );
        }
    }
    if !r.ignored_columns.is_empty() {
        println!("  忽略列: {}", r.ignored_columns.join(", "));
    }
}

fn print_stock_import(r: &StockImportReport) {
    println!(
        "{}: 共 {} 行，写入 {}，耗时 {}ms",
        r.source, r.total_rows, r.imported, r.elapsed_ms
    );
    if !r.dropped_columns.is_empty() {
        println!("  丢弃列: {}", r.dropped_columns.join(", "));
    }
    if !r.ignored_columns.is_empty() {
        println!("  忽略列: {}", r.ignored_columns.join(", "));
    }
}

fn print_orders(orders: &[Order]) {
    for o in orders {
        println!(
            "{:>6}  {}/{}  Maq={} Sec={}  {} x {} x {}  {}  {} m3",
            o.id,
            opt(&o.order_number),
            opt(&o.position),
            opt(&o.machine),
            o.sequence.map_or("-".to_string(), |s| s.to_string()),
            opt(&o.thickness),
            opt(&o.width),
            opt(&o.length),
            opt(&o.quality),
            o.volume_m3.map_or("-".to_string(), |v| format!("{:.3}", v)),
        );
    }
    println!("共 {} 行", orders.len());
}

fn print_batches(batches: &[LoadBatch]) {
    for b in batches {
        println!(
            "{:>4}  {}  {} 行  {}  {}",
            b.id,
            b.loaded_at,
            b.row_count,
            opt(&b.source_file),
            opt(&b.operator)
        );
    }
}

fn print_reconciliation(s: &ReconciliationSummary) {
    for r in &s.rows {
        println!(
            "{:>8} x {:>8} x {:>8}  {:<6} 订单 {:>10.3}  库存 {:>10.3}  差额 {:>10.3}{}",
            opt(&r.key.thickness),
            opt(&r.key.width),
            opt(&r.key.length),
            opt(&r.key.quality),
            r.ordered_volume_m3,
            r.stock_volume_m3,
            r.difference_m3,
            if r.is_shortage() { "  !" } else { "" }
        );
    }
    println!(
        "合计: 订单 {:.3} m3，库存 {:.3} m3，差额 {:.3} m3，不足 {} 组",
        s.total_ordered_m3, s.total_stock_m3, s.total_difference_m3, s.shortage_count
    );
}

fn print_filter_options(o: &FilterOptions) {
    println!("Maq:       {}", o.machines.join(", "));
    println!("EspesroMP: {}", o.thicknesses.join(", "));
    println!("AnchoMP:   {}", o.widths.join(", "));
    println!("LAR_DEC:   {}", o.lengths.join(", "));
    println!("CalidadMP: {}", o.qualities.join(", "));
}
