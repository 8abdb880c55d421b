use std::env;

use zim_reader::{ZimArchive, DirectoryEntry};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-zim-file> [--url <NAMESPACE>/<URL>]", args[0]);
        std::process::exit(1);
    }

    let zim_path = &args[1];
    let mut lookup: Option<(u8, String)> = None;
    // Parse --url argument
    if let Some(url_idx) = args.iter().position(|arg| arg == "--url") {
        if let Some(url_str) = args.get(url_idx + 1) {
            match url_str.split_once('/') {
                Some((ns, url)) if ns.len() == 1 => {
                    lookup = Some((ns.as_bytes()[0], url.to_string()));
                }
                _ => {
                    eprintln!("ERROR: Invalid --url format. Expected <NAMESPACE>/<URL>, e.g. A/Main_Page");
                    std::process::exit(1);
                }
            }
        } else {
            eprintln!("ERROR: --url flag requires an argument.");
            std::process::exit(1);
        }
    }

    println!("Reading ZIM archive: {}", zim_path);
    println!("{}", "=".repeat(60));

    let archive = match ZimArchive::open_path(zim_path) {
        Ok(archive) => archive,
        Err(e) => {
            eprintln!("\nERROR: Failed to open ZIM archive");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let header = archive.header();
    println!("\nArchive Information:");
    println!("  Version: {}", header.version);
    println!("  UUID: {:02x?}", archive.uuid());
    println!("  Articles: {}", archive.total_articles());
    println!("  Clusters: {}", header.cluster_count);
    println!("  MIME types: {}", archive.mime_types().len());
    if let Some(main_page) = archive.main_page() {
        println!("  Main page index: {}", main_page);
    }

    println!("\nSample Articles (first 10 content entries):");
    for (i, result) in archive.iter_articles().take(10).enumerate() {
        match result {
            Ok((index, mime)) => match archive.get_by_index(index, false) {
                Ok(article) => println!(
                    "  {}. [{}] {}/{} ({})",
                    i + 1,
                    index,
                    article.entry.namespace() as char,
                    article.entry.url(),
                    mime
                ),
                Err(e) => println!("  {}. [{}] <error: {}>", i + 1, index, e),
            },
            Err(e) => {
                eprintln!("\nERROR: Failed while iterating articles");
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some((namespace, url)) = lookup {
        println!("\nLookup {}/{}:", namespace as char, url);
        match archive.get_by_url(namespace, &url, true) {
            Ok(Some(article)) => {
                let mime = article.mime.as_deref().unwrap_or("-");
                let size = article.data.as_ref().map_or(0, Vec::len);
                println!("  Found at index {}: {} bytes, {}", article.index, size, mime);
                if let DirectoryEntry::Content { common, .. } = &article.entry {
                    println!("  Title: {}", common.title);
                }
            }
            Ok(None) => println!("  Not found."),
            Err(e) => {
                eprintln!("  ERROR: {}", e);
                std::process::exit(1);
            }
        }
    }
}
