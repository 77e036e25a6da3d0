//! Multi-corpus expansion orchestration.
//!
//! One corpus set holds a single **target** corpus (index 0) and any number
//! of **external** corpora. Per query, every corpus runs first-stage
//! retrieval and relevance-model estimation against its own indexes in its
//! own task; externals remap their models into the target vocabulary
//! through a term back-map built from the two lexica. Every task then runs
//! the weighted second stage against the *target's* inverted index, and the
//! per-corpus rankings are fused by reciprocal rank.
//!
//! All mapped structures are shared read-only across tasks; each task owns
//! its cursors and heap. A failing task aborts the whole query.

use std::collections::HashMap;
use std::thread;

use expand_store::docvector::DocumentIndex;
use expand_store::lexicon::{load_docid_map, Lexicon};
use expand_store::postings::{PlainIndex, PostingIndex};
use expand_store::ranker::Ranker;
use expand_store::wand::WandData;
use expand_store::TermId;

use crate::config::CollectionConfig;
use crate::error::{SearchError, SearchResult};
use crate::expansion::{
    add_original_query, normalize_weighted_query, normalize_weighted_query_ext,
    query_from_ext_to_src, rm_expansion, WeightedQuery,
};
use crate::fusion::reciprocal_rank_fusion;
use crate::query::{parse_query, TermIdQuery};
use crate::sampler::WeightedSampler;
use crate::topk::TopKList;
use crate::traversal::{block_max_wand, maxscore, wand, weighted_maxscore};

/// One corpus's loaded, read-only state.
pub struct Corpus {
    pub config: CollectionConfig,
    pub index: PlainIndex,
    pub wand_data: WandData,
    pub forward: DocumentIndex,
    pub ranker: Ranker,
    pub lexicon: Lexicon,
    /// Docid to external-name map; loaded for the target only.
    pub doc_map: Vec<String>,
    /// External-vocabulary term id to target term id; empty on the target.
    back_map: HashMap<TermId, TermId>,
}

impl Corpus {
    /// Memory-map the inverted index and WAND metadata, load the forward
    /// index and lexicon, and build the ranker from the stored statistics.
    pub fn load(config: CollectionConfig) -> SearchResult<Self> {
        eprintln!("loading index from {}", config.invidx_file.display());
        let index = PlainIndex::open(&config.invidx_file)?;
        eprintln!("loading forward index from {}", config.fidx_file.display());
        let forward = DocumentIndex::open(&config.fidx_file)?;
        eprintln!("loading wand data from {}", config.wand_file.display());
        let wand_data = WandData::open(&config.wand_file)?;
        let ranker = wand_data.ranker();
        let lexicon = Lexicon::from_path(&config.lexicon_file, false)?;
        let doc_map = if config.target {
            load_docid_map(&config.map_file)?
        } else {
            Vec::new()
        };
        Ok(Self {
            config,
            index,
            wand_data,
            forward,
            ranker,
            lexicon,
            doc_map,
            back_map: HashMap::new(),
        })
    }

    /// Build the external-to-target term mapping by looking every target
    /// surface form up in this corpus's lexicon.
    pub fn build_back_map(&mut self, target_lexicon: &Lexicon) {
        for (term, target_id) in target_lexicon.iter() {
            if let Some(ext_id) = self.lexicon.get(term) {
                self.back_map.insert(ext_id, target_id);
            }
        }
        eprintln!("back map: {} shared terms", self.back_map.len());
    }

    pub fn back_map(&self) -> &HashMap<TermId, TermId> {
        &self.back_map
    }

    /// Touch the posting lists of every query term so the first timed run
    /// does not pay the page faults.
    pub fn warmup(&self, queries: &[(u32, Vec<String>)]) {
        let mut warmed: std::collections::HashSet<TermId> = std::collections::HashSet::new();
        for (_, tokens) in queries {
            for term in parse_query(tokens, &self.lexicon) {
                if warmed.insert(term) {
                    self.index.warmup(term);
                }
            }
        }
    }

    /// First-stage retrieval plus relevance-model estimation on this
    /// corpus, interpolated with the original query and expressed in the
    /// target vocabulary.
    pub fn run_rm(&self, mut parsed_query: TermIdQuery) -> SearchResult<WeightedQuery> {
        let first_stage = wand(
            &self.index,
            &self.wand_data,
            &self.ranker,
            &parsed_query,
            self.config.docs_to_expand as usize,
        )?;
        let mut weighted_query = rm_expansion(
            &self.forward,
            &first_stage.topk,
            self.config.terms_to_expand as usize,
        )?;
        if self.config.target {
            normalize_weighted_query(&mut weighted_query);
        } else {
            normalize_weighted_query_ext(&mut weighted_query, &self.back_map);
            query_from_ext_to_src(&mut parsed_query, &self.back_map);
        }
        add_original_query(self.config.lambda, &mut weighted_query, &parsed_query);
        Ok(weighted_query)
    }

    /// Like [`run_rm`](Self::run_rm) but sampling `gen_queries` bag-of-words
    /// queries from the model instead of emitting one weighted query.
    pub fn run_rm_sampler(
        &self,
        mut parsed_query: TermIdQuery,
        sampler: &mut WeightedSampler,
    ) -> SearchResult<Vec<TermIdQuery>> {
        let first_stage = block_max_wand(
            &self.index,
            &self.wand_data,
            &self.ranker,
            &parsed_query,
            self.config.docs_to_expand as usize,
        )?;
        let mut weighted_query = rm_expansion(
            &self.forward,
            &first_stage.topk,
            self.config.terms_to_expand as usize,
        )?;
        if self.config.target {
            normalize_weighted_query(&mut weighted_query);
        } else {
            normalize_weighted_query_ext(&mut weighted_query, &self.back_map);
            query_from_ext_to_src(&mut parsed_query, &self.back_map);
        }
        Ok(sampler.generate_query_batch(
            &weighted_query,
            &parsed_query,
            5,
            15,
            self.config.gen_queries as usize,
        ))
    }

    /// Weighted second stage against this corpus's own index; called on the
    /// target.
    pub fn final_run(&self, weighted_query: &WeightedQuery) -> SearchResult<TopKList> {
        Ok(weighted_maxscore(
            &self.index,
            &self.wand_data,
            &self.ranker,
            weighted_query,
            self.config.final_k as usize,
        )?
        .topk)
    }

    /// Unweighted second stage for sampled bag-of-words sub-queries.
    pub fn final_run_bow(&self, query: &TermIdQuery) -> SearchResult<TopKList> {
        Ok(maxscore(
            &self.index,
            &self.wand_data,
            &self.ranker,
            query,
            self.config.final_k as usize,
        )?
        .topk)
    }
}

/// The target plus its external corpora.
pub struct CorpusSet {
    corpora: Vec<Corpus>,
}

impl CorpusSet {
    /// Load every corpus and wire the external back-maps. The first config
    /// must be the target.
    pub fn load(configs: Vec<CollectionConfig>) -> SearchResult<Self> {
        if configs.is_empty() {
            return Err(SearchError::Config("no corpora configured".to_string()));
        }
        if !configs[0].target {
            return Err(SearchError::Config(
                "first corpus must be the target".to_string(),
            ));
        }
        if configs.iter().skip(1).any(|c| c.target) {
            return Err(SearchError::Config(
                "exactly one target corpus is allowed".to_string(),
            ));
        }
        let mut corpora = Vec::with_capacity(configs.len());
        for config in configs {
            corpora.push(Corpus::load(config)?);
        }
        let (target, externals) = corpora.split_at_mut(1);
        for external in externals {
            external.build_back_map(&target[0].lexicon);
        }
        Ok(Self { corpora })
    }

    pub fn target(&self) -> &Corpus {
        &self.corpora[0]
    }

    pub fn corpora(&self) -> &[Corpus] {
        &self.corpora
    }

    /// Run one query end to end: parallel per-corpus expansion, weighted
    /// second stage on the target, reciprocal-rank fusion, truncation to
    /// the target's result depth.
    pub fn run_query(&self, raw_query: &[String]) -> SearchResult<TopKList> {
        let target = self.target();
        let rankings: Vec<SearchResult<TopKList>> = thread::scope(|scope| {
            let tasks: Vec<_> = self
                .corpora
                .iter()
                .map(|corpus| {
                    scope.spawn(move || {
                        let parsed = parse_query(raw_query, &corpus.lexicon);
                        let weighted_query = corpus.run_rm(parsed)?;
                        target.final_run(&weighted_query)
                    })
                })
                .collect();
            tasks.into_iter().map(|t| t.join().unwrap()).collect()
        });

        let mut runs = Vec::with_capacity(rankings.len());
        for ranking in rankings {
            runs.push(ranking?);
        }
        let mut fused = reciprocal_rank_fusion(&runs);
        fused.truncate(target.config.final_k as usize);
        Ok(fused)
    }

    /// Sampler variant: externals contribute generated bag-of-words
    /// sub-queries, the target contributes the raw parsed query, and every
    /// sub-query runs plain MaxScore on the target before fusion.
    pub fn run_query_sampler(
        &self,
        raw_query: &[String],
        sampler: &mut WeightedSampler,
    ) -> SearchResult<TopKList> {
        let target = self.target();

        // Query generation draws from one seeded stream, so it stays
        // sequential; the sub-query retrieval below is the parallel part.
        let mut sub_queries: Vec<TermIdQuery> = Vec::new();
        for corpus in self.corpora.iter().skip(1) {
            let parsed = parse_query(raw_query, &corpus.lexicon);
            sub_queries.extend(corpus.run_rm_sampler(parsed, sampler)?);
        }
        sub_queries.push(parse_query(raw_query, &target.lexicon));

        let rankings: Vec<SearchResult<TopKList>> = thread::scope(|scope| {
            let tasks: Vec<_> = sub_queries
                .iter()
                .map(|query| scope.spawn(move || target.final_run_bow(query)))
                .collect();
            tasks.into_iter().map(|t| t.join().unwrap()).collect()
        });

        let mut runs = Vec::with_capacity(rankings.len());
        for ranking in rankings {
            runs.push(ranking?);
        }
        let mut fused = reciprocal_rank_fusion(&runs);
        fused.truncate(target.config.final_k as usize);
        Ok(fused)
    }
}
