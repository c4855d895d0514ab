//! Example demonstrating structured and string search
//!
//! Run with: cargo run --example query_example

use corpusquery::tsv::load_str;
use corpusquery::{SearchMode, Searcher, StringRequest, YearFilter};

const CORPUS: &str = "\
A\tcore\t0\t1\tB\t私\t私\tワタクシ\t代名詞
A\tcore\t1\t2\tI\tの\tの\tノ\t助詞-格助詞
A\tcore\t2\t4\tI\t先生\t先生\tセンセイ\t名詞-普通名詞-一般
A\tcore\t4\t5\tI\tが\tが\tガ\t助詞-格助詞
A\tcore\t5\t6\tI\t来\t来る\tクル\t動詞-非自立可能\tカ行変格\t連用形-一般\tキ\t和
A\tcore\t6\t7\tI\tた\tた\tタ\t助動詞\t助動詞-タ\t終止形-一般\tタ\t和
A\tcore\t7\t8\tI\t。\t。\t\t補助記号-句点
A\tcore\t8\t10\tB\t先生\t先生\tセンセイ\t名詞-普通名詞-一般
A\tcore\t10\t11\tI\tの\tの\tノ\t助詞-格助詞
A\tcore\t11\t12\tI\t本\t本\tホン\t名詞-普通名詞-一般
";

fn main() {
    let corpus = load_str(CORPUS, "夏目漱石 こころ").expect("Failed to read corpus");
    let searcher = Searcher::new(corpus);
    let separator = searcher.config().separator.clone();

    // Nouns directly followed by a particle, with a の somewhere before them
    let query = r#"
        key pos="名詞%";
        pre 3 within lemma="の";
        post 1 pos="助詞%";
    "#;

    println!("Query:");
    println!("{}", query);

    let hits = searcher
        .search_query(query, YearFilter::all())
        .expect("Failed to run query");
    println!("{} structured matches", hits.total_hits);
    for result in &hits.results {
        if let Some(line) = searcher.context_window(result) {
            println!("  {}", line.render(&separator));
        }
    }
    println!();

    let request = StringRequest::new("先生*た", SearchMode::Wildcard);
    let hits = searcher.search_string(&request).expect("Failed to compile pattern");
    println!("{} string matches for {:?}", hits.total_hits, request.query);
    for line in searcher.rehydrate(&hits.matches) {
        println!("  {}", line.render(&separator));
    }
}
