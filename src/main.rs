use clap::Parser;
use spinecfi::{MetadataEntry, MetadataTagConfigs, Package, Result, TocTree, TocTreeStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 📚 spinecfi - EPUB包模型与CFI工具
#[derive(Parser)]
#[command(name = "spinecfi")]
#[command(about = "查看EPUB包结构，解析并生成CFI地址")]
#[command(version)]
struct Args {
    /// 出版物路径（.epub压缩包或解压后的目录）
    #[arg(required_unless_present = "init_config", help = "要处理的EPUB文件或目录")]
    epub: Option<PathBuf>,

    /// 详细输出模式
    #[arg(short, long, help = "显示详细信息并输出调试日志")]
    verbose: bool,

    /// 显示元数据信息
    #[arg(short, long, help = "显示元数据")]
    metadata: bool,

    /// 显示清单
    #[arg(long, help = "显示清单项")]
    manifest: bool,

    /// 显示脊柱
    #[arg(short, long, help = "显示脊柱（阅读顺序）")]
    spine: bool,

    /// 显示导航表
    #[arg(short, long, help = "显示导航表目录树")]
    nav: bool,

    /// 按属性筛选清单项
    #[arg(short, long, value_name = "TOKEN", help = "列出声明了该属性的清单项，如 nav 或 rendition:layout")]
    property: Vec<String>,

    /// 定位CFI
    #[arg(short, long, value_name = "CFI", help = "把CFI定位到清单项，可重复")]
    resolve: Vec<String>,

    /// 为每个脊柱项生成CFI
    #[arg(long, help = "为每个脊柱项生成当前有效的CFI")]
    mint: bool,

    /// 元数据标签配置文件
    #[arg(short, long, value_name = "PATH", help = "元数据标签配置文件（YAML）")]
    config: Option<PathBuf>,

    /// 生成默认配置文件
    #[arg(long, value_name = "PATH", help = "把默认元数据标签配置写入指定文件")]
    init_config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("❌ 错误: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if let Some(path) = &args.init_config {
        MetadataTagConfigs::generate_default_config(path)?;
        println!("✅ 已生成默认配置文件: {}", path.display());
    }

    let Some(epub) = &args.epub else {
        return Ok(());
    };

    let configs = MetadataTagConfigs::load_or_default(args.config.as_deref())?;
    let package = Package::open_with_config(spinecfi::open_reader(epub)?, configs)?;

    println!("📦 {} (EPUB {})", package.package_path(), package.version());
    println!(
        "  清单项: {}, 脊柱项: {}, 导航表: {}",
        package.manifest().len(),
        package.spine().len(),
        package.navigation_tables().len()
    );

    if args.metadata {
        display_metadata(&package, args.verbose);
    }
    if args.manifest {
        display_manifest(&package, args.verbose);
    }
    if args.spine {
        display_spine(&package);
    }
    if args.nav {
        display_navigation(&package, args.verbose);
    }
    for token in &args.property {
        display_items_with_property(&package, token)?;
    }
    if args.mint {
        display_minted_cfis(&package);
    }
    for cfi in &args.resolve {
        resolve_cfi(&package, cfi);
    }

    Ok(())
}

fn display_metadata(package: &Package, verbose: bool) {
    println!("\n📊 元数据:");
    if let Some(unique_id) = package.unique_id() {
        println!("  唯一标识: {}", unique_id);
    }

    let configs = package.metadata_tag_configs();
    let fields = [
        ("标题", &configs.title),
        ("语言", &configs.language),
        ("标识符", &configs.identifier),
        ("出版社", &configs.publisher),
        ("出版日期", &configs.date),
        ("描述", &configs.description),
        ("主题", &configs.subject),
        ("版权", &configs.rights),
        ("修改时间", &configs.modified),
    ];
    for (label, config) in fields {
        if let Some(value) = package.configured_value(config) {
            println!("  {}: {}", label, value);
        }
    }

    if let Some(creator) = package.creator() {
        println!("  作者: {}", creator.value);
        for refinement in &creator.refinements {
            println!("    {} = {}", refinement.property, refinement.value);
        }
    }
    if let Some(cover) = package.cover_image() {
        println!("  封面: {} ({})", cover.href, cover.media_type);
    }

    if verbose {
        println!("\n  全部条目:");
        let mut entries: Vec<&MetadataEntry> = package.metadata().iter().map(|(_, entry)| entry).collect();
        entries.sort_by(|a, b| a.property.cmp(&b.property));
        for entry in entries {
            println!("    {} = {}", entry.property, entry.value);
        }
    }
}

fn display_manifest(package: &Package, verbose: bool) {
    println!("\n📁 清单:");
    for (i, item) in package.manifest().iter().enumerate() {
        println!("  {}. [{}] {} ({})", i + 1, item.id, item.href, item.media_type);
        if verbose {
            for property in &item.properties {
                println!("       属性: {}", property);
            }
            let chain = package.manifest().fallback_chain(item);
            if !chain.is_empty() {
                let ids: Vec<&str> = chain.iter().map(|fallback| fallback.id.as_str()).collect();
                println!("       回退: {}", ids.join(" → "));
            }
        }
    }
}

fn display_spine(package: &Package) {
    println!("\n📖 脊柱:");
    for item in package.spine() {
        let linear = if item.is_linear() { "" } else { " (非线性)" };
        println!("  {}. {} [步进 {}]{}", item.index + 1, item.idref, item.cfi_step(), linear);
    }
}

fn display_navigation(package: &Package, verbose: bool) {
    println!("\n🌳 导航表:");
    let mut titles: Vec<&String> = package.navigation_tables().keys().collect();
    titles.sort();

    for title in titles {
        let Some(table) = package.navigation_table(title) else {
            continue;
        };
        let mut tree = TocTree::from_table(table).with_style(TocTreeStyle::TreeSymbols);
        if !verbose {
            tree = tree.with_show_paths(false).with_max_depth(Some(3));
        }
        println!("\n  [{}] 📊 {}", title, tree.statistics());
        println!("{}", tree);
    }
}

fn display_items_with_property(package: &Package, token: &str) -> Result<()> {
    let property = package.property_iri_from_attribute_value(token)?;
    let items = package.manifest_items_with_properties(std::slice::from_ref(&property));
    println!("\n🔖 属性 {} ({}): {} 项", token, property, items.len());
    for item in items {
        println!("  [{}] {}", item.id, item.href);
    }
    Ok(())
}

fn display_minted_cfis(package: &Package) {
    println!("\n📍 脊柱项CFI:");
    for item in package.spine() {
        println!("  {} → epubcfi({})", item.idref, package.cfi_for_spine_item(item));
    }
}

fn resolve_cfi(package: &Package, input: &str) {
    println!("\n🎯 定位 {}", input);
    let mut cfi = match spinecfi::parse_cfi(input) {
        Ok(cfi) => cfi,
        Err(e) => {
            println!("  ❌ 无法解析: {}", e);
            return;
        }
    };

    match package.manifest_item_for_cfi(&mut cfi) {
        Ok(target) => {
            println!(
                "  清单项: [{}] {} (脊柱第 {} 项)",
                target.manifest_item.id,
                target.manifest_item.href,
                target.spine_item.index + 1
            );
            if let Some(remainder) = &target.remainder {
                println!("  文档内路径: {}", remainder);
            }
            if target.corrected {
                println!("  ⚠️  步进值已过期，纠正为: {}", cfi);
            }
        }
        Err(e) => println!("  ❌ {}", e),
    }
}
