/// Data layer: table model, loading, and the row/column transforms.
///
/// Architecture:
/// ```text
///  barcodes.tsv   query.tsv   hg19_multianno.txt
///        │             │              │
///        ▼             ▼              ▼
///   ┌──────────┐
///   │  loader   │  parse TSV → RecordSet ('.' is null)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   join    │  annotation ⋈ query on the variant key
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  split    │  bundle → rows → (gene, transcript, exon, coding, aa)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  include / exclude / thresholds → surviving rows
///   └──────────┘
/// ```

pub mod filter;
pub mod join;
pub mod loader;
pub mod model;
pub mod split;
