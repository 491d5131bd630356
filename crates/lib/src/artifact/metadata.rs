//! `maven-metadata.xml` documents.

use serde::Deserialize;

/// Root `<metadata>` element. Only the parts version resolution reads are
/// modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
  #[serde(default)]
  pub versioning: Versioning,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Versioning {
  #[serde(default)]
  pub versions: Versions,

  #[serde(rename = "lastUpdated", default)]
  pub last_updated: Option<String>,

  #[serde(default)]
  pub snapshot: Option<Snapshot>,

  #[serde(rename = "snapshotVersions", default)]
  pub snapshot_versions: SnapshotVersions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Versions {
  #[serde(rename = "version", default)]
  pub items: Vec<String>,
}

/// The newest unique build of a snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
  #[serde(default)]
  pub timestamp: Option<String>,

  #[serde(rename = "buildNumber", default)]
  pub build_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotVersions {
  #[serde(rename = "snapshotVersion", default)]
  pub items: Vec<SnapshotVersion>,
}

/// One published file of a snapshot build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotVersion {
  #[serde(default)]
  pub classifier: Option<String>,

  #[serde(default)]
  pub extension: Option<String>,

  pub value: String,
}

impl Metadata {
  pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
  }

  /// The unique revision of a snapshot for `classifier`.
  ///
  /// Prefers the `snapshotVersion` entry with a matching classifier and falls
  /// back to `<base>-<timestamp>-<buildNumber>` from the `snapshot` element.
  pub fn unique_revision(&self, base: &str, classifier: Option<&str>) -> Option<String> {
    let versioning = &self.versioning;
    versioning
      .snapshot_versions
      .items
      .iter()
      .find(|entry| entry.classifier.as_deref() == classifier)
      .map(|entry| entry.value.clone())
      .or_else(|| {
        let snapshot = versioning.snapshot.as_ref()?;
        let timestamp = snapshot.timestamp.as_deref()?;
        let build_number = snapshot.build_number.as_deref()?;
        Some(format!("{base}-{timestamp}-{build_number}"))
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RELEASES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>com.example</groupId>
  <artifactId>myservice</artifactId>
  <versioning>
    <latest>1.2.0</latest>
    <release>1.2.0</release>
    <versions>
      <version>1.0.0</version>
      <version>1.1.0</version>
      <version>1.2.0</version>
    </versions>
    <lastUpdated>20151105011659</lastUpdated>
  </versioning>
</metadata>
"#;

  const SNAPSHOT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>com.example</groupId>
  <artifactId>myservice</artifactId>
  <version>1.1.1-SNAPSHOT</version>
  <versioning>
    <snapshot>
      <timestamp>20151102.035053</timestamp>
      <buildNumber>8</buildNumber>
    </snapshot>
    <lastUpdated>20151105011659</lastUpdated>
    <snapshotVersions>
      <snapshotVersion>
        <extension>pom</extension>
        <value>1.1.1-20151102.035053-8</value>
        <updated>20151102035053</updated>
      </snapshotVersion>
      <snapshotVersion>
        <classifier>marathon</classifier>
        <extension>json</extension>
        <value>1.1.1-20151102.035053-8</value>
        <updated>20151102035053</updated>
      </snapshotVersion>
    </snapshotVersions>
  </versioning>
</metadata>
"#;

  #[test]
  fn parses_release_versions() {
    let metadata = Metadata::parse(RELEASES).unwrap();
    assert_eq!(metadata.versioning.versions.items, vec!["1.0.0", "1.1.0", "1.2.0"]);
    assert_eq!(metadata.versioning.last_updated.as_deref(), Some("20151105011659"));
    assert!(metadata.versioning.snapshot.is_none());
  }

  #[test]
  fn parses_snapshot_versions() {
    let metadata = Metadata::parse(SNAPSHOT).unwrap();
    let versioning = &metadata.versioning;
    assert_eq!(versioning.snapshot_versions.items.len(), 2);
    assert_eq!(versioning.snapshot_versions.items[1].classifier.as_deref(), Some("marathon"));
    assert_eq!(
      versioning.snapshot.as_ref().and_then(|s| s.build_number.as_deref()),
      Some("8")
    );
  }

  #[test]
  fn unique_revision_matches_classifier() {
    let metadata = Metadata::parse(SNAPSHOT).unwrap();
    assert_eq!(
      metadata.unique_revision("1.1.1", Some("marathon")).as_deref(),
      Some("1.1.1-20151102.035053-8")
    );
  }

  #[test]
  fn unique_revision_falls_back_to_snapshot_element() {
    let metadata = Metadata::parse(SNAPSHOT).unwrap();
    assert_eq!(
      metadata.unique_revision("1.1.1", Some("docker")).as_deref(),
      Some("1.1.1-20151102.035053-8")
    );

    let bare = Metadata::parse(RELEASES).unwrap();
    assert_eq!(bare.unique_revision("1.1.1", None), None);
  }
}
