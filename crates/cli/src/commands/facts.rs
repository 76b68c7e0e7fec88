//! `mentat facts` — list the stored fact memory.

pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    let (facts, _snapshots) = super::load_facts(&config).await?;

    let all = facts.all_facts().await;
    if all.is_empty() {
        println!("No facts stored yet.");
        return Ok(());
    }

    println!("{} facts:\n", all.len());
    for fact in &all {
        println!(
            "  [{}] ({}, {:.2}) {}",
            fact.timestamp.format("%Y-%m-%d %H:%M:%S"),
            fact.source,
            fact.relevance_score,
            fact.content
        );
    }
    Ok(())
}
