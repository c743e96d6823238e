use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{NewProfile, ProfileContent, ProfileKind, ProfileVersion};
use crate::store::RecordStore;

/// Commits a profile as the next version for the user.
/// CRITICAL: This is append-only. Existing versions are never rewritten.
pub async fn commit_profile(
    store: &dyn RecordStore,
    user_id: Uuid,
    content: ProfileContent,
    event_count_at_generation: i64,
    kind: ProfileKind,
) -> Result<ProfileVersion, AppError> {
    let profile = store
        .insert_profile(NewProfile {
            user_id,
            event_count_at_generation,
            kind,
            content,
        })
        .await?;

    info!(
        "Committed {} profile v{} for user {} at {} events",
        profile.kind.as_str(),
        profile.version,
        user_id,
        event_count_at_generation
    );
    Ok(profile)
}

/// Renders a profile version as a markdown document.
pub fn render_profile_to_md(profile: &ProfileVersion) -> String {
    let content = &profile.content;
    let mut md = format!(
        "# DNA Dossier v{} ({})\n\n_Generated {} from {} decisions._\n\n",
        profile.version,
        profile.kind.as_str(),
        profile.created_at.format("%Y-%m-%d"),
        profile.event_count_at_generation
    );

    md.push_str(&format!("{}\n\n", content.summary));

    let ip = &content.intellectual_profile;
    md.push_str("## Intellectual Profile\n\n");
    md.push_str(&format!("- **Thinking style:** {}\n", ip.thinking_style));
    push_list(&mut md, "Primary interests", &ip.primary_interests);
    push_list(&mut md, "Depth areas", &ip.knowledge_depth_areas);
    push_list(&mut md, "Curiosity patterns", &ip.curiosity_patterns);
    md.push('\n');

    let cs = &content.cognitive_signature;
    md.push_str("## Cognitive Signature\n\n");
    md.push_str(&format!("- **Analytical:** {}\n", cs.analytical_tendencies));
    md.push_str(&format!("- **Information:** {}\n", cs.information_preferences));
    md.push_str(&format!("- **Debate:** {}\n\n", cs.debate_engagement_style));

    if !content.topic_clusters.is_empty() {
        md.push_str("## Topic Clusters\n\n");
        for cluster in &content.topic_clusters {
            md.push_str(&format!("### {} ({:.0}/100)\n", cluster.name, cluster.strength));
            if !cluster.keywords.is_empty() {
                md.push_str(&format!("- **Keywords:** {}\n", cluster.keywords.join(", ")));
            }
            if !cluster.sample_interests.is_empty() {
                md.push_str(&format!(
                    "- **Examples:** {}\n",
                    cluster.sample_interests.join(", ")
                ));
            }
            md.push('\n');
        }
    }

    if let Some(notes) = &content.evolution_notes {
        md.push_str(&format!("## Evolution\n\n{notes}\n"));
    }
    md
}

fn push_list(md: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        md.push_str(&format!("- **{label}:** {}\n", items.join(", ")));
    }
}
