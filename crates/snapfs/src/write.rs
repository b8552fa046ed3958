//! The write pipeline.
//!
//! [`create_dataset`] turns a candidate snapshot plus a streaming body into
//! an immutable, signed, content-addressed snapshot. Component writers run
//! in a fixed order because later writers consume addresses produced by
//! earlier ones: body, meta, transform, structure, stats, readme, viz,
//! commit, then the root dataset object, and finally one node write that
//! groups every link under the returned root address.

use crate::body::{caused_by_processor, decode_body_value, BodyOutcome, BodyProcessor};
use crate::config::Config;
use crate::error::Error;
use crate::event::{publish, EventPublisher, SaveEvent, Topic};
use crate::render::Renderer;
use crate::switches::SaveSwitches;
use dataset::{
    sign, to_canonical_json, Commit, Component, Dataset, Readme, Stats, StoredComponent,
    Transform, Viz,
};
use delta::{describe, BodyAction, DescribeParams};
use ed25519_dalek::SigningKey;
use store::{Address, Links, ObjectStore};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// A streaming body supplied alongside the candidate snapshot.
pub type Body = Box<dyn AsyncRead + Send + Unpin>;

/// Everything one save needs. The candidate is borrowed exclusively for the
/// duration of the call and comes back fully finalized: derived fields
/// attached, component addresses assigned, and `path` set to the root.
pub struct SaveRequest<'a> {
    /// Store the previous snapshot (and its body and scripts) load from.
    pub source: &'a dyn ObjectStore,
    /// Store the new snapshot is written to.
    pub destination: &'a dyn ObjectStore,
    pub candidate: &'a mut Dataset,
    pub body: Option<Body>,
    /// The snapshot this save descends from, dereferenced.
    pub previous: Option<&'a Dataset>,
    pub private_key: Option<&'a SigningKey>,
    pub switches: SaveSwitches,
    pub publisher: &'a dyn EventPublisher,
    pub renderer: Option<&'a dyn Renderer>,
    pub cancel: CancellationToken,
    pub config: Config,
}

/// Write `req.candidate` as a new snapshot, returning its root address.
#[tracing::instrument(skip_all, fields(name = %req.candidate.name))]
pub async fn create_dataset(mut req: SaveRequest<'_>) -> Result<Address, Error> {
    let username = req.candidate.peername.clone();
    let name = req.candidate.name.clone();
    publish(
        req.publisher,
        Topic::DatasetSaveStarted,
        &SaveEvent {
            username: username.clone(),
            name: name.clone(),
            completion: 0.0,
            ..Default::default()
        },
    );

    let cancel = req.cancel.clone();
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = save(&mut req) => result,
    };

    let mut completed = SaveEvent {
        username,
        name,
        completion: 1.0,
        ..Default::default()
    };
    match &result {
        Ok(address) => {
            completed.path = Some(address.to_string());
            completed.message = req
                .candidate
                .commit
                .as_ref()
                .map(|commit| commit.title.clone())
                .unwrap_or_default();
        }
        Err(error) => completed.error = Some(error.to_string()),
    }
    publish(req.publisher, Topic::DatasetSaveCompleted, &completed);
    result
}

async fn save(req: &mut SaveRequest<'_>) -> Result<Address, Error> {
    let key = req.private_key.ok_or(Error::NoPrivateKey)?;
    if req.switches.new_name && req.previous.is_some() {
        return Err(Error::InvalidDataset(
            "dataset already exists, but the save asserts a new name".to_string(),
        ));
    }

    let mut body = req.body.take();
    apply_drops(req.candidate, &req.switches, &mut body);
    if !req.switches.replace {
        refill_from_previous(req.candidate, req.previous, &req.switches);
    }
    if let Some(prev) = req.previous {
        if !prev.path.is_empty() {
            req.candidate.previous_path = prev.path.clone();
        }
    }

    let structure = req
        .candidate
        .structure
        .as_ref()
        .ok_or_else(|| Error::InvalidDataset("structure is required".to_string()))?;
    if structure.format.is_empty() {
        return Err(Error::InvalidDataset("structure.format is required".to_string()));
    }

    // The commit timestamp pins the moment of user intent: assigned exactly
    // once, at the start of body processing, not when the write completes.
    let commit = req.candidate.commit.get_or_insert_with(Commit::default);
    if commit.timestamp.is_none() {
        commit.timestamp = Some(req.switches.timestamp());
    }

    // Resolve the body reader. With no new body, the previous snapshot's
    // body is carried forward byte for byte.
    let mut body_action = BodyAction::Default;
    let body: Body = match body {
        Some(body) => body,
        None => {
            let prev = req
                .previous
                .filter(|prev| !prev.body_path.is_empty())
                .ok_or(Error::MissingBody)?;
            let bytes = req.source.get(&prev.body_path).await?;
            body_action = BodyAction::Same;
            Box::new(std::io::Cursor::new(bytes))
        }
    };

    // 1. Body: stream into the store while the processor derives fields.
    let (mut tee, processor) = BodyProcessor::spawn(structure, body, &req.config)?;
    let put_result = req.destination.put_stream(&mut tee).await;
    drop(tee); // closes the fan-out channel; the worker runs to completion
    let (body_address, outcome) = match put_result {
        Ok(address) => (address, processor.finish().await?),
        Err(err) => {
            if caused_by_processor(&err) {
                processor.finish().await?;
            }
            return Err(err.into());
        }
    };
    if body_action != BodyAction::Same {
        body_action = outcome.action;
    }
    tracing::debug!(
        address = %body_address,
        length = outcome.length,
        entries = outcome.entries,
        ?body_action,
        "wrote body"
    );

    {
        let st = req.candidate.structure.as_mut().expect("validated above");
        st.length = outcome.length;
        st.entries = outcome.entries;
        st.depth = outcome.depth;
        st.err_count = outcome.err_count;
        if req.destination.is_content_addressed() {
            st.checksum = body_address.clone();
        }
    }
    req.candidate.body_path = body_address.clone();

    let mut links = Links::new();
    links.insert(req.candidate.body_filename(), body_address.clone());

    // 2. Meta.
    if let Some(meta) = req.candidate.meta.as_mut() {
        let mut out = meta.clone();
        out.path = Address::default();
        let address = req.destination.put(to_canonical_json(&out)?.into()).await?;
        meta.path = address.clone();
        links.insert(Component::Meta.filename(""), address);
    }

    // 3. Transform: its script first, so the transform object can carry the
    // script's address.
    if let Some(tf) = req.candidate.transform.as_mut() {
        if let Some(script) = tf.script.clone() {
            let address = req.destination.put(script).await?;
            tf.script_path = address.clone();
            links.insert(Component::TransformScript.filename(""), address);
        }
        let mut out = tf.clone();
        out.path = Address::default();
        let address = req.destination.put(to_canonical_json(&out)?.into()).await?;
        tf.path = address.clone();
        links.insert(Component::Transform.filename(""), address);
    }

    // 4. Structure, now carrying the body checksum and derived fields.
    {
        let st = req.candidate.structure.as_mut().expect("validated above");
        let mut out = st.clone();
        out.path = Address::default();
        let address = req.destination.put(to_canonical_json(&out)?.into()).await?;
        st.path = address.clone();
        links.insert(Component::Structure.filename(""), address);
    }

    // 5. Stats: an unchanged body re-uses the previous stats address.
    let reused_stats = req.previous.and_then(|prev| {
        let stats_path = prev
            .stats
            .as_ref()
            .map(|stats| stats.path.clone())
            .filter(|path| !path.is_empty())?;
        (prev.body_path == body_address).then_some(stats_path)
    });
    match reused_stats {
        Some(address) => {
            req.candidate.stats = Some(Stats {
                path: address.clone(),
                ..Default::default()
            });
            links.insert(Component::Stats.filename(""), address);
        }
        None => {
            if let Some(doc) = outcome.stats.clone() {
                let mut out = Stats {
                    path: Address::default(),
                    stats: Some(doc),
                };
                let address = req.destination.put(to_canonical_json(&out)?.into()).await?;
                out.path = address.clone();
                links.insert(Component::Stats.filename(""), address);
                req.candidate.stats = Some(out);
            }
        }
    }

    // 6. Readme: the prose is stored as its own blob; the readme object
    // itself stays inlined in the root snapshot.
    if let Some(rm) = req.candidate.readme.as_mut() {
        if let Some(script) = rm.script.clone() {
            let address = req.destination.put(script).await?;
            rm.script_path = address.clone();
            links.insert(Component::ReadmeScript.filename(""), address);
        }
    }

    // 7. Viz, with optional rendering.
    if let Some(viz) = req.candidate.viz.as_mut() {
        if let Some(script) = viz.script.clone() {
            let address = req.destination.put(script).await?;
            viz.script_path = address.clone();
            links.insert(Component::VizScript.filename(""), address);
        }
    }
    if req.switches.should_render {
        let script = req
            .candidate
            .viz
            .as_ref()
            .and_then(|viz| viz.script.clone());
        if let Some(script) = script {
            let renderer = req
                .renderer
                .ok_or_else(|| Error::Render("no renderer configured".to_string()))?;
            let rendered = renderer
                .render(&script, outcome.small_body.as_ref())
                .map_err(|err| Error::Render(err.to_string()))?;
            let address = req.destination.put(rendered.into()).await?;
            req.candidate.viz.as_mut().expect("checked above").rendered_path = address.clone();
            links.insert(Component::RenderedViz.filename(""), address);
        }
    }

    // 8. Commit, gated on the byte-level change check.
    let force = req.switches.force_if_no_changes;
    if let Some(prev) = req.previous {
        if !force
            && shallow_components_equal(req.candidate, prev)
            && candidate_path_map(req.candidate, &body_address) == previous_path_map(prev)
        {
            return Err(Error::NoChanges);
        }
    }

    // Script text on both sides is read back from the store so edits to a
    // transform or readme script diff as text.
    let prev_inlined = match req.previous {
        Some(prev) => Some(inline_scripts(req.source, prev).await?),
        None => None,
    };
    if let Some(tf) = req.candidate.transform.as_mut() {
        if tf.script.is_none() && !tf.script_path.is_empty() {
            tf.script = Some(req.source.get(&tf.script_path).await?);
        }
    }
    if let Some(rm) = req.candidate.readme.as_mut() {
        if rm.script.is_none() && !rm.script_path.is_empty() {
            rm.script = Some(req.source.get(&rm.script_path).await?);
        }
    }
    let prev_body_value =
        load_previous_body(req, &mut body_action, &body_address, &outcome).await?;

    let (title, message) = describe(&DescribeParams {
        prev: prev_inlined.as_ref(),
        next: req.candidate,
        prev_body: prev_body_value.as_ref(),
        next_body: outcome.small_body.as_ref(),
        action: body_action,
        force,
        file_hint: req.switches.file_hint.as_deref(),
    })
    .ok_or(Error::NoChanges)?;

    {
        let commit = req.candidate.commit.as_mut().expect("assigned above");
        if commit.title.is_empty() {
            commit.title = title;
        }
        if commit.message.is_empty() {
            commit.message = message;
        }
    }

    publish(
        req.publisher,
        Topic::DatasetSaveProgress,
        &SaveEvent {
            username: req.candidate.peername.clone(),
            name: req.candidate.name.clone(),
            message: req
                .candidate
                .commit
                .as_ref()
                .map(|commit| commit.title.clone())
                .unwrap_or_default(),
            completion: 0.9,
            ..Default::default()
        },
    );

    let signature = sign::sign(req.candidate, key);
    {
        let commit = req.candidate.commit.as_mut().expect("assigned above");
        commit.signature = signature;
        let mut out = commit.clone();
        out.path = Address::default();
        let address = req.destination.put(to_canonical_json(&out)?.into()).await?;
        commit.path = address.clone();
        links.insert(Component::Commit.filename(""), address);
    }

    // 9. The root dataset object, every stored component in reference form.
    let mut root = req.candidate.clone();
    root.path = Address::default();
    root.meta = root.meta.map(|c| c.to_reference());
    root.structure = root.structure.map(|c| c.to_reference());
    root.stats = root.stats.map(|c| c.to_reference());
    root.commit = root.commit.map(|c| c.to_reference());
    root.transform = root.transform.map(|c| c.to_reference());
    if let Some(rm) = root.readme.as_mut() {
        rm.script = None;
    }
    if let Some(viz) = root.viz.as_mut() {
        viz.script = None;
    }
    let address = req.destination.put(to_canonical_json(&root)?.into()).await?;
    links.insert(Component::Dataset.filename(""), address);

    let root_address = req.destination.put_node(&links).await?;
    if req.switches.pin {
        req.destination.pin(&root_address).await?;
    }
    req.candidate.path = root_address.clone();
    tracing::debug!(address = %root_address, "wrote snapshot");
    Ok(root_address)
}

fn apply_drops(candidate: &mut Dataset, switches: &SaveSwitches, body: &mut Option<Body>) {
    for component in &switches.drop {
        match component {
            Component::Meta => candidate.meta = None,
            Component::Structure => candidate.structure = None,
            Component::Stats => candidate.stats = None,
            Component::Readme => candidate.readme = None,
            Component::Viz => candidate.viz = None,
            Component::Transform => candidate.transform = None,
            Component::Body => *body = None,
            _ => {}
        }
    }
}

/// Refill components the candidate is missing from the previous snapshot.
/// Components named in the drop list stay dropped, which makes
/// drop-plus-refill read as "revert this component".
fn refill_from_previous(
    candidate: &mut Dataset,
    previous: Option<&Dataset>,
    switches: &SaveSwitches,
) {
    let Some(prev) = previous else { return };
    if candidate.meta.is_none() && !switches.drops(Component::Meta) {
        candidate.meta = prev.meta.clone();
    }
    if candidate.structure.is_none() && !switches.drops(Component::Structure) {
        candidate.structure = prev.structure.clone();
    }
    if candidate.stats.is_none() && !switches.drops(Component::Stats) {
        candidate.stats = prev.stats.clone();
    }
    if candidate.readme.is_none() && !switches.drops(Component::Readme) {
        candidate.readme = prev.readme.clone();
    }
    if candidate.viz.is_none() && !switches.drops(Component::Viz) {
        candidate.viz = prev.viz.clone();
    }
    if candidate.transform.is_none() && !switches.drops(Component::Transform) {
        candidate.transform = prev.transform.clone();
    }
}

/// Shallow equality of the components the path map can't see through:
/// addresses are cleared, staged script bytes ignored (their content is
/// captured by the content-addressed script path).
fn shallow_components_equal(candidate: &Dataset, prev: &Dataset) -> bool {
    fn viz(v: &Option<Viz>) -> Option<Viz> {
        v.as_ref().map(|v| Viz {
            path: Address::default(),
            rendered_path: Address::default(),
            script: None,
            ..v.clone()
        })
    }
    fn readme(r: &Option<Readme>) -> Option<Readme> {
        r.as_ref().map(|r| Readme {
            path: Address::default(),
            script: None,
            ..r.clone()
        })
    }
    fn transform(t: &Option<Transform>) -> Option<Transform> {
        t.as_ref().map(|t| Transform {
            path: Address::default(),
            script: None,
            ..t.clone()
        })
    }

    viz(&candidate.viz) == viz(&prev.viz)
        && readme(&candidate.readme) == readme(&prev.readme)
        && transform(&candidate.transform) == transform(&prev.transform)
}

/// Addresses of every stored component except the dataset and commit.
fn candidate_path_map(candidate: &Dataset, body_address: &Address) -> Links {
    let mut map = Links::new();
    let mut add = |name: &str, address: Option<&Address>| {
        if let Some(address) = address.filter(|a| !a.is_empty()) {
            map.insert(name.to_string(), address.clone());
        }
    };
    add("meta", candidate.meta.as_ref().map(|c| &c.path));
    add("structure", candidate.structure.as_ref().map(|c| &c.path));
    add("stats", candidate.stats.as_ref().map(|c| &c.path));
    add("transform", candidate.transform.as_ref().map(|c| &c.path));
    add("body", Some(body_address));
    map
}

fn previous_path_map(prev: &Dataset) -> Links {
    let mut map = Links::new();
    let mut add = |name: &str, address: Option<&Address>| {
        if let Some(address) = address.filter(|a| !a.is_empty()) {
            map.insert(name.to_string(), address.clone());
        }
    };
    add("meta", prev.meta.as_ref().map(|c| &c.path));
    add("structure", prev.structure.as_ref().map(|c| &c.path));
    add("stats", prev.stats.as_ref().map(|c| &c.path));
    add("transform", prev.transform.as_ref().map(|c| &c.path));
    add(
        "body",
        (!prev.body_path.is_empty()).then_some(&prev.body_path),
    );
    map
}

/// Clone the previous snapshot with its transform and readme scripts read
/// back from the store, so textual edits to scripts surface in the diff.
async fn inline_scripts(source: &dyn ObjectStore, prev: &Dataset) -> Result<Dataset, Error> {
    let mut prev = prev.clone();
    if let Some(tf) = prev.transform.as_mut() {
        if tf.script.is_none() && !tf.script_path.is_empty() {
            tf.script = Some(source.get(&tf.script_path).await?);
        }
    }
    if let Some(rm) = prev.readme.as_mut() {
        if rm.script.is_none() && !rm.script_path.is_empty() {
            rm.script = Some(source.get(&rm.script_path).await?);
        }
    }
    Ok(prev)
}

/// Load and decode the previous snapshot's body for diffing, when it's
/// needed and small enough. A previous body over the threshold flips the
/// action to `TooBig`, the same as an oversized candidate body.
async fn load_previous_body(
    req: &SaveRequest<'_>,
    body_action: &mut BodyAction,
    body_address: &Address,
    outcome: &BodyOutcome,
) -> Result<Option<serde_json::Value>, Error> {
    let Some(prev) = req.previous else {
        return Ok(None);
    };
    if *body_action != BodyAction::Default
        || outcome.small_body.is_none()
        || prev.body_path.is_empty()
    {
        return Ok(None);
    }
    // An identical body can't produce row changes; exclude it from the
    // diff entirely rather than decoding both sides.
    if prev.body_path == *body_address {
        *body_action = BodyAction::Same;
        return Ok(None);
    }

    let bytes = req.source.get(&prev.body_path).await?;
    if bytes.len() as u64 > req.config.body_size_small_enough_to_diff {
        *body_action = BodyAction::TooBig;
        return Ok(None);
    }

    let structure = prev
        .structure
        .as_ref()
        .or(req.candidate.structure.as_ref())
        .ok_or_else(|| Error::InvalidDataset("previous snapshot has no structure".to_string()))?;
    let format: rows::Format = structure.format.parse()?;
    let value = decode_body_value(format, &structure.format_config, bytes.to_vec())?;
    Ok(Some(value))
}
