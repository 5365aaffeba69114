use folio::content::Draft;

const DEFAULT_API: &str = "http://localhost:3000";

fn print_usage_and_exit() -> ! {
    eprintln!("Usage: publish <file.md> [api-base]");
    std::process::exit(1);
}

fn main() {
    let mut args = std::env::args().skip(1); // 跳过程序名

    let file = args.next().unwrap_or_else(|| {
        eprintln!("Missing <file.md>");
        print_usage_and_exit();
    });

    let api_base = args.next().unwrap_or_else(|| DEFAULT_API.to_string());

    if args.next().is_some() {
        eprintln!("Too many arguments provided.");
        print_usage_and_exit();
    }

    let markdown = std::fs::read_to_string(&file).unwrap_or_else(|e| {
        eprintln!("❌ Failed to read {}: {}", file, e);
        std::process::exit(1);
    });

    let post = Draft::new(&file).content(markdown).build().unwrap_or_else(|e| {
        eprintln!("❌ Invalid draft {}: {}", file, e);
        std::process::exit(1);
    });

    let client = reqwest::blocking::Client::new();
    let res = client
        .post(format!("{}/api/posts", api_base.trim_end_matches('/')))
        .json(&post)
        .send();

    match res {
        Ok(resp) => {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            if !status.is_success() {
                eprintln!("❌ Publish rejected");
                eprintln!("{} | {}", status, text.trim());
                std::process::exit(1);
            } else {
                println!("✅ Published `{}`", post.slug);
                println!("{}", text.trim());
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to contact publish API: {}", e);
            std::process::exit(1);
        }
    }
}
