use wvht_core::{BuildReport, Comparison, IndexShape, TableStats};

pub fn comparison(first: &str, second: &str, comparison: &Comparison) -> String {
    match comparison {
        Comparison::NotFound(key) => {
            format!("\t\"{key}\" couldn't be found in your data! Comparison impossible.\n")
        }
        Comparison::Similar(sim) => {
            let cosine = match sim.cosine {
                Some(value) => format!("{value:.6}"),
                None => "undefined (zero vector)".to_string(),
            };
            format!(
                "\tThe cosine similarity of the word vectors of \"{first}\" and \"{second}\" =\n\t {cosine}\n\
                 \tThe Euclidean distance between the word vectors of \"{first}\" and \"{second}\" =\n\t {:.6}\n",
                sim.euclidean
            )
        }
    }
}

pub fn stats(stats: &TableStats) -> String {
    format!(
        "\tSize of vectors = {}\n\
         \tNumber of stored word vectors = {}\n\
         \tNumber of buckets = {}\n\
         \tLoad factor = {:.3}\n\
         \tNumber of empty buckets = {}\n\
         \tPercentage of empty buckets = {:.2} %\n\
         \tHighest number of word vectors in a bucket = {}\n\
         \tPercentage of vectors in mostly filled bucket = {:.2} %\n",
        stats.vector_size,
        stats.record_count,
        stats.table_size,
        stats.load_factor,
        stats.empty_buckets,
        stats.empty_bucket_pct,
        stats.max_chain,
        stats.max_chain_pct,
    )
}

pub fn shape(shape: &IndexShape) -> String {
    format!(
        "Your index file contains\n\t{} word vectors\n\twith {} dimensions in {} buckets.\n",
        shape.record_count, shape.vector_size, shape.table_size
    )
}

pub fn build(report: &BuildReport) -> String {
    let mut text = format!(
        "Index created and saved (\"{}\").\n",
        report.output.display()
    );
    if report.skipped > 0 {
        text.push_str(&format!("\tSkipped {} malformed lines\n", report.skipped));
    }
    text.push_str(&stats(&report.stats));
    text
}
