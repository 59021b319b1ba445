use cookieguard::cookies::{Cookie, CookieFilter, CookieStore, MemoryCookieJar};
use cookieguard::engine::{EngineConfig, PolicyEngine, Request, Response};
use cookieguard::host::TracingNotifier;
use cookieguard::policy::{ListKind, Rule, RulePattern};
use cookieguard::storage::JsonFileStore;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::temp_dir().join("cookieguard-demo.json");
    let store = JsonFileStore::open(&path).await?;
    let jar = Arc::new(MemoryCookieJar::new());

    let engine = PolicyEngine::new(EngineConfig::default(), jar.clone(), Arc::new(store), Arc::new(TracingNotifier)).await;
    let handle = Arc::new(engine).start();

    println!("--- Step 1: Configuring policy ---");
    let bank = Rule::new(15)
        .encrypted()
        .with_pattern(RulePattern::parse("/bank/i")?);
    handle
        .request(Request::SaveRule { key: "bank".into(), rule: bank })
        .await?;
    handle
        .request(Request::AddToList { list: ListKind::Blacklist, pattern: "*.ads.example.com".into() })
        .await?;

    println!("\n--- Step 2: Sites setting cookies ---");
    jar.set(Cookie::new("sess", "mybank.com", "abc")).await?;
    jar.set(Cookie::new("track", "x.ads.example.com", "1")).await?;
    jar.set(Cookie::new("_ga", ".news.example.org", "GA1.2.3")).await?;

    // Give the engine tasks a moment to react.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for cookie in jar.list(CookieFilter::all()).await? {
        println!("{} = {} (expires {:?})", cookie.key(), cookie.value, cookie.expiration_date);
    }

    println!("\n--- Step 3: Decrypting on request ---");
    if let Response::Decrypted { value } = handle
        .request(Request::DecryptValue { domain: "mybank.com".into(), name: "sess".into() })
        .await?
    {
        println!("mybank.com/sess = {}", value);
    }

    println!("\n--- Step 4: Audit trail ---");
    if let Response::AuditLog { entries } = handle.request(Request::GetAuditLog { limit: Some(10) }).await? {
        for entry in entries {
            println!("{}", serde_json::to_string(&entry)?);
        }
    }

    if let Response::Stats(stats) = handle.request(Request::GetStats).await? {
        println!("\nStats: {}", serde_json::to_string_pretty(&stats)?);
    }

    handle.shutdown();
    println!("\nState written to {}", path.display());
    Ok(())
}
